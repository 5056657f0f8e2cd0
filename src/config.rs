//! Configuration types for ledger extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct holds every knob so a config
//! can be cloned into each chunk runner and logged as a whole.

use crate::error::LedgerError;
use crate::pipeline::group::{DateMarker, RowClassifier};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pages per chunk when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 3000;

/// Header/noise rows skipped at the top of every page grid.
pub const DEFAULT_HEADER_ROWS: usize = 3;

/// Configuration for a ledger extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use ledger2csv::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .chunk_size(500)
///     .workers(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_size, 500);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Contiguous pages handed to one chunk runner. Default: 3000.
    ///
    /// Each chunk opens its own document handle, so smaller chunks mean more
    /// document opens; larger chunks mean coarser load balancing.
    pub chunk_size: usize,

    /// Chunk runners executing at once. Default: available parallelism − 1 (min 1).
    pub workers: usize,

    /// Rows skipped at the top of each page grid before grouping. Default: 3.
    pub header_rows: usize,

    /// Which grid columns feed which record fields.
    pub columns: ColumnLayout,

    /// Table-detection tolerances for the pdfium grid provider.
    pub table: TableSettings,

    /// How record lines are written to the CSV.
    pub quoting: CsvQuoting,

    /// Decides whether a row opens a new record group. Default: [`DateMarker`].
    pub boundary: Arc<dyn RowClassifier>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
            header_rows: DEFAULT_HEADER_ROWS,
            columns: ColumnLayout::default(),
            table: TableSettings::default(),
            quoting: CsvQuoting::default(),
            boundary: Arc::new(DateMarker),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("chunk_size", &self.chunk_size)
            .field("workers", &self.workers)
            .field("header_rows", &self.header_rows)
            .field("columns", &self.columns)
            .field("table", &self.table)
            .field("quoting", &self.quoting)
            .field("boundary", &"<dyn RowClassifier>")
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// One less than the hardware concurrency, leaving a core for the writer.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn chunk_size(mut self, pages: usize) -> Self {
        self.config.chunk_size = pages;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn header_rows(mut self, rows: usize) -> Self {
        self.config.header_rows = rows;
        self
    }

    pub fn columns(mut self, layout: ColumnLayout) -> Self {
        self.config.columns = layout;
        self
    }

    pub fn table(mut self, settings: TableSettings) -> Self {
        self.config.table = settings;
        self
    }

    pub fn quoting(mut self, quoting: CsvQuoting) -> Self {
        self.config.quoting = quoting;
        self
    }

    pub fn boundary(mut self, classifier: Arc<dyn RowClassifier>) -> Self {
        self.config.boundary = classifier;
        self
    }

    /// Attach a progress callback that receives per-page events.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, LedgerError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(LedgerError::InvalidConfig(
                "chunk size must be ≥ 1".into(),
            ));
        }
        if c.workers == 0 {
            return Err(LedgerError::InvalidConfig("workers must be ≥ 1".into()));
        }
        if c.table.snap_y_tolerance < 0.0 || c.table.edge_merge_tolerance < 0.0 {
            return Err(LedgerError::InvalidConfig(
                "table tolerances must be non-negative".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Layout & detection settings ──────────────────────────────────────────

/// Grid column indices feeding each record field.
///
/// The default matches ruled ledgers where columns 1 and 3 are narrow empty
/// separator columns between double rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date_code: usize,
    pub amount: usize,
    pub content: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            date_code: 0,
            amount: 2,
            content: 4,
        }
    }
}

impl ColumnLayout {
    /// Minimum row width needed to read every field.
    pub fn required_width(&self) -> usize {
        self.date_code.max(self.amount).max(self.content) + 1
    }
}

/// Tolerances for grid detection, in PDF points.
///
/// Columns come from vertical ruling lines, rows from text baselines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Fragments whose tops differ by at most this much share a row. Default: 4.5.
    pub snap_y_tolerance: f32,
    /// Text further than this outside the outermost rules is not part of the
    /// table. Default: 50.
    pub intersection_x_tolerance: f32,
    /// Rules closer than this collapse into one column edge. Default: 3.
    pub edge_merge_tolerance: f32,
    /// Shorter vertical strokes are not treated as rules. Default: 10.
    pub min_rule_height: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_y_tolerance: 4.5,
            intersection_x_tolerance: 50.0,
            edge_merge_tolerance: 3.0,
            min_rule_height: 10.0,
        }
    }
}

/// CSV line encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CsvQuoting {
    /// `date,code,amount,content` written verbatim (default). Commas inside a
    /// field are not escaped.
    #[default]
    Raw,
    /// Quote fields containing delimiters, quotes or newlines.
    Rfc4180,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.chunk_size, 3000);
        assert_eq!(config.header_rows, 3);
        assert!(config.workers >= 1);
        assert_eq!(config.columns, ColumnLayout::default());
        assert_eq!(config.quoting, CsvQuoting::Raw);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = ExtractionConfig::builder().chunk_size(0).build().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn workers_clamped_to_one() {
        let config = ExtractionConfig::builder().workers(0).build().unwrap();
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let settings = TableSettings {
            snap_y_tolerance: -1.0,
            ..TableSettings::default()
        };
        assert!(ExtractionConfig::builder().table(settings).build().is_err());
    }

    #[test]
    fn required_width_covers_highest_index() {
        assert_eq!(ColumnLayout::default().required_width(), 5);
        let narrow = ColumnLayout {
            date_code: 0,
            amount: 1,
            content: 2,
        };
        assert_eq!(narrow.required_width(), 3);
    }

    #[test]
    fn debug_hides_trait_objects() {
        let dbg = format!("{:?}", ExtractionConfig::default());
        assert!(dbg.contains("<dyn RowClassifier>"));
    }
}

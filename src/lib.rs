//! # ledger2csv
//!
//! Extract donation-ledger records from large tabular PDFs into CSV.
//!
//! Each ledger page holds a ruled table whose first column starts with a
//! `dd/mm/yyyy` date for every new record; a record's free-text content often
//! wraps onto the following rows. The crate detects the cell grid of each
//! page, groups rows into records, and appends one CSV line per record.
//! Pages that cannot be read are logged and skipped; the run keeps going.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate the path and %PDF magic
//!  ├─ 2. Plan      count pages, split into contiguous chunks
//!  ├─ 3. Workers   one blocking thread per chunk, bounded by `workers`
//!  │     ├─ grid      pdfium text + ruling lines → rows × columns
//!  │     ├─ group     split rows at date markers
//!  │     └─ assemble  date, code, amount, content
//!  └─ 4. Sink      single writer task: CSV lines + failure log
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledger2csv::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let summary = extract("ledger.pdf", "ledger.csv", "ledger.log", &config).await?;
//!     eprintln!(
//!         "{} records from {} pages ({} failed)",
//!         summary.records_written, summary.total_pages, summary.failed_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ledger2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ledger2csv = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The pdfium shared library is loaded at run time from `PDFIUM_LIB_PATH`, the
//! current directory, or the system library path, in that order.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ColumnLayout, CsvQuoting, ExtractionConfig, ExtractionConfigBuilder, TableSettings};
pub use error::{LedgerError, PageError};
pub use extract::{
    extract, extract_sync, extract_to_sink, extract_with_source, inspect, inspect_with_source,
};
pub use output::{ChunkReport, DocumentPlan, FailureEntry, PageOutcome, Record, RunSummary};
pub use pipeline::chunk::{partition, run_chunk, Chunk, ChunkAborted};
pub use pipeline::grid::{GridProvider, GridSource, PageGrid, RecordGroup, Row};
pub use pipeline::group::{build_groups, DateMarker, RowClassifier};
pub use pipeline::pdfium::PdfiumSource;
pub use pipeline::sink::{ChannelSink, MemorySink, Sink, SinkStats, SinkWriter};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};

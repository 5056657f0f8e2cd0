//! Output types: records, failure entries and run statistics.

use crate::config::CsvQuoting;
use crate::error::LedgerError;
use crate::pipeline::grid::RecordGroup;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One normalised ledger record, the terminal output of a record group.
///
/// Values are passed through as text; dates and amounts are not validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub date: String,
    pub code: String,
    pub amount: String,
    pub content: String,
}

impl Record {
    /// Render the record as one CSV line, including the trailing newline.
    ///
    /// [`CsvQuoting::Raw`] writes `date,code,amount,content` verbatim, so a
    /// comma inside `content` shifts columns for downstream parsers.
    /// [`CsvQuoting::Rfc4180`] quotes fields that need it.
    pub fn to_csv_line(&self, quoting: CsvQuoting) -> Result<String, LedgerError> {
        match quoting {
            CsvQuoting::Raw => Ok(format!(
                "{},{},{},{}\n",
                self.date, self.code, self.amount, self.content
            )),
            CsvQuoting::Rfc4180 => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .terminator(csv::Terminator::Any(b'\n'))
                    .from_writer(Vec::new());
                writer
                    .write_record([&self.date, &self.code, &self.amount, &self.content])
                    .map_err(|e| LedgerError::Internal(format!("csv encode: {e}")))?;
                let bytes = writer
                    .into_inner()
                    .map_err(|e| LedgerError::Internal(format!("csv flush: {e}")))?;
                String::from_utf8(bytes)
                    .map_err(|e| LedgerError::Internal(format!("csv utf-8: {e}")))
            }
        }
    }
}

/// One line of the failure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureEntry {
    /// A page failed; `group` is the group under construction, if any.
    Page {
        page: usize,
        message: String,
        group: Option<RecordGroup>,
    },
    /// A whole chunk aborted before or between pages.
    Chunk {
        start: usize,
        end: usize,
        message: String,
    },
}

impl fmt::Display for FailureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureEntry::Page {
                page,
                message,
                group: Some(group),
            } => write!(
                f,
                "Error at page number {page}, err: {message}, group: {group:?}"
            ),
            FailureEntry::Page { page, message, .. } => {
                write!(f, "Error at page number {page}, err: {message}, group: none")
            }
            FailureEntry::Chunk {
                start,
                end,
                message,
            } => write!(f, "Error at chunk {start}..{end}, err: {message}"),
        }
    }
}

/// Outcome of one page after the page worker returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageOutcome {
    /// All groups on the page became records.
    Written { records: usize },
    /// The page failed; `records` were appended before the failure.
    Failed { records: usize },
}

impl PageOutcome {
    pub fn records(&self) -> usize {
        match self {
            PageOutcome::Written { records } | PageOutcome::Failed { records } => *records,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PageOutcome::Failed { .. })
    }
}

/// Per-chunk totals returned by the chunk runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub start: usize,
    pub end: usize,
    /// Pages actually visited after clamping to the document's page count.
    pub visited_pages: usize,
    pub failed_pages: usize,
    pub records: usize,
}

/// Whole-run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_pages: usize,
    pub chunks: usize,
    pub workers: usize,
    /// Pages that produced no failure entry.
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub records_written: usize,
    pub failures_logged: usize,
    /// Chunks that aborted on a resource error, as `(start, end)`.
    pub failed_chunks: Vec<(usize, usize)>,
    pub elapsed_ms: u64,
}

/// Page count and chunk plan for a document, without extracting anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPlan {
    pub page_count: usize,
    pub chunk_size: usize,
    pub chunks: Vec<(usize, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> Record {
        Record {
            date: "01/02/2020".into(),
            code: "ABC".into(),
            amount: "100".into(),
            content: content.into(),
        }
    }

    #[test]
    fn raw_line_is_unescaped() {
        let line = record("Gift, from X").to_csv_line(CsvQuoting::Raw).unwrap();
        assert_eq!(line, "01/02/2020,ABC,100,Gift, from X\n");
    }

    #[test]
    fn rfc4180_line_quotes_commas() {
        let line = record("Gift, from X")
            .to_csv_line(CsvQuoting::Rfc4180)
            .unwrap();
        assert_eq!(line, "01/02/2020,ABC,100,\"Gift, from X\"\n");
    }

    #[test]
    fn rfc4180_line_leaves_plain_fields_alone() {
        let line = record("Gift").to_csv_line(CsvQuoting::Rfc4180).unwrap();
        assert_eq!(line, "01/02/2020,ABC,100,Gift\n");
    }

    #[test]
    fn page_failure_without_group_says_none() {
        let entry = FailureEntry::Page {
            page: 3,
            message: "no table".into(),
            group: None,
        };
        assert_eq!(
            entry.to_string(),
            "Error at page number 3, err: no table, group: none"
        );
    }

    #[test]
    fn page_failure_with_group_lists_rows() {
        let entry = FailureEntry::Page {
            page: 0,
            message: "short row".into(),
            group: Some(vec![vec!["01/02/2020".into(), "x".into()]]),
        };
        assert_eq!(
            entry.to_string(),
            "Error at page number 0, err: short row, group: [[\"01/02/2020\", \"x\"]]"
        );
    }

    #[test]
    fn chunk_failure_display() {
        let entry = FailureEntry::Chunk {
            start: 3000,
            end: 6000,
            message: "corrupt".into(),
        };
        assert_eq!(entry.to_string(), "Error at chunk 3000..6000, err: corrupt");
    }

    #[test]
    fn outcome_counts() {
        assert_eq!(PageOutcome::Written { records: 4 }.records(), 4);
        assert!(PageOutcome::Failed { records: 0 }.is_failure());
        assert!(!PageOutcome::Written { records: 0 }.is_failure());
    }
}

//! Error types for the ledger2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LedgerError`] — **Fatal for its scope**: the document cannot be opened,
//!   pdfium cannot be bound, or the output files cannot be written. Raised
//!   before a page loop starts it aborts the run; raised inside a chunk it
//!   aborts only that chunk.
//!
//! * [`PageError`] — **Non-fatal**: a single page had no detectable table or
//!   a row was too narrow for the column layout. The page worker turns it into
//!   a [`crate::output::FailureEntry`] and moves on to the next page.

use std::path::PathBuf;
use thiserror::Error;

/// Resource-class errors returned by the ledger2csv library.
///
/// Page-level failures use [`PageError`] and end up in the failure log rather
/// than being propagated here.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place libpdfium next to the binary,\n\
or install pdfium as a system library.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not open or append to the CSV or log file.
    #[error("Failed to write '{path}': {source}")]
    SinkWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dedicated writer stopped receiving lines.
    #[error("Output writer is no longer accepting lines")]
    SinkClosed,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Page numbers are the 0-based indices used throughout the failure log.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Table detection found nothing, or the page could not be loaded.
    #[error("Page {page}: no table detected: {detail}")]
    GridUnavailable { page: usize, detail: String },

    /// A row is narrower than the column layout requires.
    #[error("Page {page}: row {row} has {columns} cells, index {required} is out of range")]
    MalformedRow {
        page: usize,
        row: usize,
        columns: usize,
        required: usize,
    },
}

impl PageError {
    /// The page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::GridUnavailable { page, .. } | PageError::MalformedRow { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_row_display() {
        let e = PageError::MalformedRow {
            page: 7,
            row: 1,
            columns: 3,
            required: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 7"), "got: {msg}");
        assert!(msg.contains("3 cells"), "got: {msg}");
        assert!(msg.contains("index 4"), "got: {msg}");
    }

    #[test]
    fn grid_unavailable_display() {
        let e = PageError::GridUnavailable {
            page: 2,
            detail: "no ruling lines".into(),
        };
        assert!(e.to_string().contains("no ruling lines"));
        assert_eq!(e.page(), 2);
    }

    #[test]
    fn corrupt_pdf_display() {
        let e = LedgerError::CorruptPdf {
            path: PathBuf::from("ledger.pdf"),
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("ledger.pdf"));
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn sink_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = LedgerError::SinkWriteFailed {
            path: PathBuf::from("out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("out.csv"));
    }
}

//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as chunk runners work through the document.
//!
//! # Example
//!
//! ```rust
//! use ledger2csv::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     records: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page: usize, records: usize) {
//!         self.records.fetch_add(records, Ordering::SeqCst);
//!         eprintln!("page {page}: {records} records");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { records: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::RunSummary;
use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// Chunks run in parallel on blocking threads, so page events arrive from
/// several threads at once and in no particular page order. Within one chunk
/// they arrive in index order. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once, after the page count is known and before any chunk starts.
    fn on_run_start(&self, total_pages: usize, chunks: usize) {
        let _ = (total_pages, chunks);
    }

    /// Called when a page's records have all been appended.
    ///
    /// # Arguments
    /// * `page`    — 0-based page index
    /// * `records` — records appended for this page
    fn on_page_complete(&self, page: usize, records: usize) {
        let _ = (page, records);
    }

    /// Called when a page is logged as failed.
    fn on_page_error(&self, page: usize, error: &str) {
        let _ = (page, error);
    }

    /// Called when a chunk has visited all of its pages.
    fn on_chunk_complete(&self, start: usize, end: usize) {
        let _ = (start, end);
    }

    /// Called once after every chunk has finished or aborted.
    fn on_run_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        records: AtomicUsize,
        errors: AtomicUsize,
        chunks: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _page: usize, records: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
            self.records.fetch_add(records, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _start: usize, _end: usize) {
            self.chunks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(5, 1);
        cb.on_page_complete(0, 3);
        cb.on_page_error(1, "no table");
        cb.on_chunk_complete(0, 5);
        cb.on_run_complete(&RunSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_complete(0, 4);
        tracker.on_page_complete(1, 2);
        tracker.on_page_error(2, "no table");
        tracker.on_chunk_complete(0, 3);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.records.load(Ordering::SeqCst), 6);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.chunks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10, 1);
        cb.on_page_complete(0, 1);
    }
}

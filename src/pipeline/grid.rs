//! Cell grid model and the provider seam.
//!
//! A [`GridSource`] opens a document and lends a [`GridProvider`] to a visitor
//! for as long as the document stays open. Chunk runners each open their own
//! document, so no decode state is shared between chunks.

use crate::error::{LedgerError, PageError};
use std::path::Path;

/// One detected table row; index 0 holds date/code tokens by convention.
pub type Row = Vec<String>;

/// All rows detected on one page, header rows included.
pub type PageGrid = Vec<Row>;

/// The rows that together describe one logical record.
pub type RecordGroup = Vec<Row>;

/// Per-document access to detected table grids.
pub trait GridProvider {
    /// Number of pages in the open document.
    fn page_count(&self) -> usize;

    /// Detect the table on page `page` (0-based) and return its cells.
    fn grid(&mut self, page: usize) -> Result<PageGrid, PageError>;

    /// Drop anything cached for `page`. Called after every page, success or not.
    fn release(&mut self, page: usize);
}

/// Opens documents and hands out providers.
pub trait GridSource: Send + Sync {
    /// Open `path` and run `visit` against a provider for the document.
    ///
    /// The document is closed when this returns.
    fn open(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&mut dyn GridProvider) -> Result<(), LedgerError>,
    ) -> Result<(), LedgerError>;

    /// Open `path` just long enough to count its pages.
    fn page_count(&self, path: &Path) -> Result<usize, LedgerError> {
        let mut count = 0;
        self.open(path, &mut |provider| {
            count = provider.page_count();
            Ok(())
        })?;
        Ok(count)
    }
}

/// Releases a page on drop so every exit path of the page worker evicts it.
pub(crate) struct PageLease<'a> {
    provider: &'a mut dyn GridProvider,
    page: usize,
}

impl<'a> PageLease<'a> {
    pub(crate) fn new(provider: &'a mut dyn GridProvider, page: usize) -> Self {
        Self { provider, page }
    }

    pub(crate) fn grid(&mut self) -> Result<PageGrid, PageError> {
        self.provider.grid(self.page)
    }
}

impl Drop for PageLease<'_> {
    fn drop(&mut self) {
        self.provider.release(self.page);
    }
}

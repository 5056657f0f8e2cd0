//! pdfium-backed grid source.
//!
//! ## Why bind per document?
//!
//! `PdfDocument` borrows the `Pdfium` instance that loaded it, so the pair
//! cannot be stored together. Each [`GridSource::open`] call binds pdfium,
//! loads the document, and lends a provider to the visitor; all three are
//! dropped together when the chunk finishes. With the `thread_safe` feature
//! pdfium-render serialises calls into the C library across threads.

use crate::config::TableSettings;
use crate::error::{LedgerError, PageError};
use crate::pipeline::grid::{GridProvider, GridSource, PageGrid};
use crate::pipeline::table::{detect_grid, vertical_rules, PathBox, TextFragment};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Opens ledgers with pdfium and detects their tables.
#[derive(Debug, Clone)]
pub struct PdfiumSource {
    settings: TableSettings,
}

impl PdfiumSource {
    pub fn new(settings: TableSettings) -> Self {
        Self { settings }
    }

    /// Bind to `PDFIUM_LIB_PATH` if set, else a library next to the binary,
    /// else the system library.
    fn bind(&self) -> Result<Pdfium, LedgerError> {
        let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
            Some(path) => Pdfium::bind_to_library(Path::new(&path)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| LedgerError::PdfiumBindingFailed(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl Default for PdfiumSource {
    fn default() -> Self {
        Self::new(TableSettings::default())
    }
}

impl GridSource for PdfiumSource {
    fn open(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&mut dyn GridProvider) -> Result<(), LedgerError>,
    ) -> Result<(), LedgerError> {
        let pdfium = self.bind()?;
        let document =
            pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| LedgerError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: format!("{:?}", e),
                })?;

        let mut provider = PdfiumGridProvider {
            document: &document,
            open_page: None,
            settings: self.settings,
        };
        visit(&mut provider)
    }
}

struct PdfiumGridProvider<'d, 'p> {
    document: &'d PdfDocument<'p>,
    /// The most recently loaded page, kept until `release`.
    open_page: Option<(usize, PdfPage<'p>)>,
    settings: TableSettings,
}

impl GridProvider for PdfiumGridProvider<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn grid(&mut self, page: usize) -> Result<PageGrid, PageError> {
        let total = self.page_count();
        if page >= total {
            return Err(PageError::GridUnavailable {
                page,
                detail: format!("out of range (document has {total} pages)"),
            });
        }

        let pdf_page =
            self.document
                .pages()
                .get(page as u16)
                .map_err(|e| PageError::GridUnavailable {
                    page,
                    detail: format!("{:?}", e),
                })?;

        let height = pdf_page.height().value;
        let fragments = text_fragments(&pdf_page, height).map_err(|e| {
            PageError::GridUnavailable {
                page,
                detail: format!("text extraction failed: {:?}", e),
            }
        })?;
        let rules = vertical_rules(&path_boxes(&pdf_page, height), &self.settings);
        debug!(
            "Page {}: {} text fragments, {} rule candidates",
            page,
            fragments.len(),
            rules.len()
        );

        let grid = detect_grid(page, &fragments, &rules, &self.settings);
        self.open_page = Some((page, pdf_page));
        grid
    }

    fn release(&mut self, page: usize) {
        if self.open_page.as_ref().is_some_and(|(open, _)| *open == page) {
            self.open_page = None;
        }
    }
}

/// Text segments with their boxes flipped to a top-left origin.
fn text_fragments(page: &PdfPage, page_height: f32) -> Result<Vec<TextFragment>, PdfiumError> {
    let text = page.text()?;
    let mut fragments = Vec::new();

    for segment in text.segments().iter() {
        let content = segment.text();
        if content.trim().is_empty() {
            continue;
        }
        let bounds = segment.bounds();
        fragments.push(TextFragment {
            text: content,
            left: bounds.left().value,
            right: bounds.right().value,
            top: page_height - bounds.top().value,
            bottom: page_height - bounds.bottom().value,
        });
    }

    Ok(fragments)
}

/// Bounding boxes of every vector path on the page.
fn path_boxes(page: &PdfPage, page_height: f32) -> Vec<PathBox> {
    page.objects()
        .iter()
        .filter(|object| object.object_type() == PdfPageObjectType::Path)
        .filter_map(|object| object.bounds().ok())
        .map(|bounds| PathBox {
            left: bounds.left().value,
            right: bounds.right().value,
            top: page_height - bounds.top().value,
            bottom: page_height - bounds.bottom().value,
        })
        .collect()
}

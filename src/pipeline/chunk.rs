//! Chunk runner and the static page partition it works from.

use crate::config::ExtractionConfig;
use crate::error::LedgerError;
use crate::output::ChunkReport;
use crate::pipeline::grid::{GridProvider, GridSource};
use crate::pipeline::page::process_page;
use crate::pipeline::sink::Sink;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// A half-open range of page indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `[0, total_pages)` into contiguous chunks of `chunk_size` pages.
///
/// Only the last chunk may be shorter.
pub fn partition(total_pages: usize, chunk_size: usize) -> Vec<Chunk> {
    let size = chunk_size.max(1);
    (0..total_pages)
        .step_by(size)
        .map(|start| Chunk {
            start,
            end: (start + size).min(total_pages),
        })
        .collect()
}

/// A chunk that stopped early, with the totals it reached before stopping.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ChunkAborted {
    pub report: ChunkReport,
    #[source]
    pub error: LedgerError,
}

/// Open the document once and run every page of `chunk` in index order.
///
/// Indices at or past the document's page count are skipped. Page failures
/// are logged by the page worker and do not stop the chunk. Opening the
/// document, writing to the sink, or a panic while processing a page aborts
/// this chunk only; the returned [`ChunkAborted`] carries the pages and
/// records completed before that point.
pub fn run_chunk(
    source: &dyn GridSource,
    path: &Path,
    chunk: Chunk,
    config: &ExtractionConfig,
    sink: &dyn Sink,
) -> Result<ChunkReport, ChunkAborted> {
    let mut report = ChunkReport {
        start: chunk.start,
        end: chunk.end,
        ..ChunkReport::default()
    };

    let opened = source.open(path, &mut |provider: &mut dyn GridProvider| {
        let end = chunk.end.min(provider.page_count());
        debug!("Chunk {}..{}: visiting pages {}..{}", chunk.start, chunk.end, chunk.start, end);

        for page in chunk.start..end {
            // The provider may be mid-page after a panic, so the chunk stops here.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                process_page(&mut *provider, page, config, sink)
            }))
            .map_err(|payload| {
                LedgerError::Internal(format!(
                    "page {} panicked: {}",
                    page,
                    panic_message(payload.as_ref())
                ))
            })??;
            report.visited_pages += 1;
            report.records += outcome.records();
            if outcome.is_failure() {
                report.failed_pages += 1;
            }
        }
        Ok(())
    });

    if let Err(error) = opened {
        return Err(ChunkAborted { report, error });
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_complete(chunk.start, chunk.end);
    }
    Ok(report)
}

/// Text of a panic payload, if it carried one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::pipeline::grid::PageGrid;
    use crate::pipeline::sink::MemorySink;

    #[test]
    fn partition_7000_by_3000() {
        assert_eq!(
            partition(7000, 3000),
            vec![
                Chunk { start: 0, end: 3000 },
                Chunk { start: 3000, end: 6000 },
                Chunk { start: 6000, end: 7000 },
            ]
        );
    }

    #[test]
    fn partition_exact_multiple() {
        let chunks = partition(6000, 3000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], Chunk { start: 3000, end: 6000 });
    }

    #[test]
    fn partition_smaller_than_chunk() {
        assert_eq!(partition(5, 3000), vec![Chunk { start: 0, end: 5 }]);
    }

    #[test]
    fn partition_empty_document() {
        assert!(partition(0, 3000).is_empty());
    }

    #[test]
    fn partition_covers_every_page_once() {
        for (total, size) in [(1, 1), (10, 3), (101, 10), (2999, 3000), (9001, 3000)] {
            let chunks = partition(total, size);
            let pages: Vec<usize> = chunks.iter().flat_map(|c| c.start..c.end).collect();
            assert_eq!(pages, (0..total).collect::<Vec<_>>(), "total={total} size={size}");
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
        }
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        assert_eq!(partition(2, 0).len(), 2);
    }

    /// A document of `pages` identical single-record pages.
    struct Uniform {
        pages: usize,
    }

    struct UniformProvider(usize);

    impl GridProvider for UniformProvider {
        fn page_count(&self) -> usize {
            self.0
        }

        fn grid(&mut self, _page: usize) -> Result<PageGrid, PageError> {
            let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
            Ok(vec![
                row(&["h"]),
                row(&["h"]),
                row(&["h"]),
                row(&["01/01/2021 X", "", "1", "", "gift"]),
            ])
        }

        fn release(&mut self, _page: usize) {}
    }

    impl GridSource for Uniform {
        fn open(
            &self,
            _path: &Path,
            visit: &mut dyn FnMut(&mut dyn GridProvider) -> Result<(), LedgerError>,
        ) -> Result<(), LedgerError> {
            visit(&mut UniformProvider(self.pages))
        }
    }

    #[test]
    fn run_chunk_clamps_to_page_count() {
        let sink = MemorySink::new();
        let report = run_chunk(
            &Uniform { pages: 3 },
            Path::new("ledger.pdf"),
            Chunk { start: 1, end: 10 },
            &ExtractionConfig::default(),
            &sink,
        )
        .unwrap();

        assert_eq!(report.visited_pages, 2);
        assert_eq!(report.records, 2);
        assert_eq!(report.failed_pages, 0);
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn source_page_count_uses_open() {
        let source = Uniform { pages: 42 };
        assert_eq!(source.page_count(Path::new("ledger.pdf")).unwrap(), 42);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let literal = panic::catch_unwind(|| panic!("plain")).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "plain");

        let formatted = panic::catch_unwind(|| panic!("page {}", 7)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "page 7");

        let opaque = panic::catch_unwind(|| std::panic::panic_any(3_u8)).unwrap_err();
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }
}

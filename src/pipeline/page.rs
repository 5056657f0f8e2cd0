//! Page worker: one page from grid to sink, with failures kept to that page.

use crate::config::ExtractionConfig;
use crate::error::{LedgerError, PageError};
use crate::output::{FailureEntry, PageOutcome};
use crate::pipeline::assemble::assemble_record;
use crate::pipeline::grid::{GridProvider, PageLease, RecordGroup};
use crate::pipeline::group::build_groups;
use crate::pipeline::sink::Sink;
use tracing::{debug, info, warn};

/// Extract page `page` and append its records to `sink`.
///
/// A [`PageError`] (no table, narrow row) becomes exactly one failure entry
/// and a [`PageOutcome::Failed`]; records appended before the failing group
/// stay in the output. Only sink errors are returned as `Err`, since they
/// affect every later page too.
///
/// The provider's page cache is released on every exit path.
pub fn process_page(
    provider: &mut dyn GridProvider,
    page: usize,
    config: &ExtractionConfig,
    sink: &dyn Sink,
) -> Result<PageOutcome, LedgerError> {
    let mut lease = PageLease::new(provider, page);

    let grid = match lease.grid() {
        Ok(grid) => grid,
        Err(e) => return record_failure(sink, config, e, None, 0),
    };
    debug!("Page {}: {} grid rows", page, grid.len());

    let groups = build_groups(&grid, config.header_rows, config.boundary.as_ref());
    let mut written = 0;
    for group in &groups {
        match assemble_record(group, &config.columns, page) {
            Ok(record) => {
                sink.append_record(&record)?;
                written += 1;
            }
            Err(e) => return record_failure(sink, config, e, Some(group.clone()), written),
        }
    }

    info!("Success get and write at: {}", page);
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_complete(page, written);
    }
    Ok(PageOutcome::Written { records: written })
}

fn record_failure(
    sink: &dyn Sink,
    config: &ExtractionConfig,
    error: PageError,
    group: Option<RecordGroup>,
    written: usize,
) -> Result<PageOutcome, LedgerError> {
    let page = error.page();
    warn!("Page {} failed: {}", page, error);
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_error(page, &error.to_string());
    }
    sink.append_failure(&FailureEntry::Page {
        page,
        message: error.to_string(),
        group,
    })?;
    Ok(PageOutcome::Failed { records: written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::grid::PageGrid;
    use crate::pipeline::sink::MemorySink;

    /// Serves one fixed grid (or error) and records releases.
    struct OnePage {
        grid: Result<PageGrid, PageError>,
        released: Vec<usize>,
    }

    impl GridProvider for OnePage {
        fn page_count(&self) -> usize {
            1
        }

        fn grid(&mut self, _page: usize) -> Result<PageGrid, PageError> {
            self.grid.clone()
        }

        fn release(&mut self, page: usize) {
            self.released.push(page);
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn header() -> PageGrid {
        vec![row(&["h"]), row(&["h"]), row(&["h"])]
    }

    #[test]
    fn writes_one_record_per_group() {
        let mut grid = header();
        grid.push(row(&["01/02/2020 ABC", "", "100", "", "Gift from X"]));
        grid.push(row(&["", "", "", "", "continued"]));
        grid.push(row(&["02/02/2020 DEF", "", "50", "", "Second"]));
        let mut provider = OnePage {
            grid: Ok(grid),
            released: vec![],
        };
        let sink = MemorySink::new();

        let outcome =
            process_page(&mut provider, 0, &ExtractionConfig::default(), &sink).unwrap();

        assert_eq!(outcome, PageOutcome::Written { records: 2 });
        let records = sink.records();
        assert_eq!(records[0].content, "Gift from X continued");
        assert_eq!(records[1].code, "DEF");
        assert_eq!(provider.released, vec![0]);
    }

    #[test]
    fn grid_failure_logs_entry_without_group() {
        let mut provider = OnePage {
            grid: Err(PageError::GridUnavailable {
                page: 5,
                detail: "no rules".into(),
            }),
            released: vec![],
        };
        let sink = MemorySink::new();

        let outcome =
            process_page(&mut provider, 5, &ExtractionConfig::default(), &sink).unwrap();

        assert_eq!(outcome, PageOutcome::Failed { records: 0 });
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            FailureEntry::Page { page: 5, group: None, .. }
        ));
        assert_eq!(provider.released, vec![5]);
    }

    #[test]
    fn malformed_group_is_logged_with_its_rows() {
        let mut grid = header();
        grid.push(row(&["01/02/2020 A", "", "1", "", "a"]));
        grid.push(row(&["02/02/2020 B", "", "2"]));
        let mut provider = OnePage {
            grid: Ok(grid),
            released: vec![],
        };
        let sink = MemorySink::new();

        let outcome =
            process_page(&mut provider, 2, &ExtractionConfig::default(), &sink).unwrap();

        assert_eq!(outcome, PageOutcome::Failed { records: 1 });
        assert_eq!(sink.records().len(), 1);
        match &sink.failures()[0] {
            FailureEntry::Page { page, group, .. } => {
                assert_eq!(*page, 2);
                assert_eq!(group.as_ref().unwrap()[0][0], "02/02/2020 B");
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        assert_eq!(provider.released, vec![2]);
    }

    #[test]
    fn header_only_page_writes_nothing() {
        let mut provider = OnePage {
            grid: Ok(header()),
            released: vec![],
        };
        let sink = MemorySink::new();

        let outcome =
            process_page(&mut provider, 0, &ExtractionConfig::default(), &sink).unwrap();
        assert_eq!(outcome, PageOutcome::Written { records: 0 });
        assert!(sink.failures().is_empty());
    }
}

//! Group builder: partition a page grid into record groups.
//!
//! A ledger entry often wraps onto several grid rows. Only its first row
//! carries a date marker in column 0; the rows below it are continuations and
//! belong to the same record until the next marked row.

use crate::pipeline::grid::{RecordGroup, Row};
use once_cell::sync::Lazy;
use regex::Regex;

/// `DD/DD/DDDD` at the start of a cell; anything may follow.
static DATE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}").unwrap());

/// Decides whether a row opens a new record.
///
/// Only consulted for rows with at least one non-empty cell; blank rows are
/// always continuations.
pub trait RowClassifier: Send + Sync {
    fn starts_record(&self, row: &[String]) -> bool;
}

impl<F> RowClassifier for F
where
    F: Fn(&[String]) -> bool + Send + Sync,
{
    fn starts_record(&self, row: &[String]) -> bool {
        self(row)
    }
}

/// Default boundary: column 0 begins with a two/two/four digit date.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateMarker;

impl RowClassifier for DateMarker {
    fn starts_record(&self, row: &[String]) -> bool {
        row.first().is_some_and(|cell| DATE_MARKER.is_match(cell))
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(String::is_empty)
}

/// Split `grid` into record groups after skipping `header_rows`.
///
/// Rows before the first marked row still form a group of their own; nothing
/// past the header is dropped.
pub fn build_groups(
    grid: &[Row],
    header_rows: usize,
    classifier: &dyn RowClassifier,
) -> Vec<RecordGroup> {
    let mut groups = Vec::new();
    let mut current: RecordGroup = Vec::new();

    for row in grid.iter().skip(header_rows) {
        let opens_record = !is_blank(row) && classifier.starts_record(row);
        if opens_record && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(row.clone());
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

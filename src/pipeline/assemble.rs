//! Record assembler: reduce a record group to four text fields.

use crate::config::ColumnLayout;
use crate::error::PageError;
use crate::output::Record;
use crate::pipeline::grid::Row;

/// Build a [`Record`] from the rows of one group.
///
/// Column text is joined across rows with single spaces and trimmed. The
/// date/code column is split on single spaces: the first two tokens become
/// `date` and `code`; with fewer than two tokens both fields get the whole
/// joined text.
///
/// Fails with [`PageError::MalformedRow`] if any row is narrower than `layout`
/// needs; no partial record is produced.
pub fn assemble_record(
    group: &[Row],
    layout: &ColumnLayout,
    page: usize,
) -> Result<Record, PageError> {
    let required = layout.required_width();
    if let Some((row, cells)) = group
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() < required)
    {
        return Err(PageError::MalformedRow {
            page,
            row,
            columns: cells.len(),
            required: required - 1,
        });
    }

    let date_code = join_column(group, layout.date_code);
    let tokens: Vec<&str> = date_code.split(' ').collect();
    let (date, code) = match tokens.as_slice() {
        [first, second, ..] => (first.to_string(), second.to_string()),
        _ => (date_code.clone(), date_code.clone()),
    };

    Ok(Record {
        date,
        code,
        amount: join_column(group, layout.amount),
        content: join_column(group, layout.content),
    })
}

fn join_column(group: &[Row], column: usize) -> String {
    group
        .iter()
        .map(|row| row[column].as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

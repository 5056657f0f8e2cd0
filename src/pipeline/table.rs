//! Table detection over positioned text and ruling lines.
//!
//! Columns come from vertical rules ("lines" strategy): every distinct rule
//! x-position is a column edge, so a double rule between two text columns
//! produces a narrow empty column. Rows come from the text itself ("text"
//! strategy): fragments whose tops lie within `snap_y_tolerance` of a row's
//! first fragment join that row.
//!
//! Coordinates use a top-left origin with y growing downward.

use crate::config::TableSettings;
use crate::error::PageError;
use crate::pipeline::grid::{PageGrid, Row};

/// Strokes thinner than this count as a single rule line.
const THIN_STROKE: f32 = 2.0;

/// A run of text with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextFragment {
    fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }
}

/// Bounding box of a vector path object on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathBox {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// X positions of vertical rules drawn by `paths`.
///
/// A thin tall path is one rule at its centre; a tall box contributes its left
/// and right sides.
pub fn vertical_rules(paths: &[PathBox], settings: &TableSettings) -> Vec<f32> {
    let mut xs = Vec::new();
    for path in paths {
        let height = (path.bottom - path.top).abs();
        if height < settings.min_rule_height {
            continue;
        }
        let width = (path.right - path.left).abs();
        if width <= THIN_STROKE {
            xs.push((path.left + path.right) / 2.0);
        } else {
            xs.push(path.left.min(path.right));
            xs.push(path.left.max(path.right));
        }
    }
    xs
}

/// Sort rule positions and collapse those within `tolerance` of each other.
pub fn merge_edges(mut xs: Vec<f32>, tolerance: f32) -> Vec<f32> {
    xs.retain(|x| x.is_finite());
    xs.sort_by(f32::total_cmp);

    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for x in xs {
        match clusters.last_mut() {
            Some(cluster) if x - cluster[cluster.len() - 1] <= tolerance => cluster.push(x),
            _ => clusters.push(vec![x]),
        }
    }

    clusters
        .iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// Build the cell grid for one page.
///
/// Every row has `edges - 1` cells; cells with no text are empty strings.
pub fn detect_grid(
    page: usize,
    fragments: &[TextFragment],
    rules: &[f32],
    settings: &TableSettings,
) -> Result<PageGrid, PageError> {
    let edges = merge_edges(rules.to_vec(), settings.edge_merge_tolerance);
    if edges.len() < 2 {
        return Err(PageError::GridUnavailable {
            page,
            detail: format!("found {} vertical ruling line(s), need at least 2", edges.len()),
        });
    }
    let columns = edges.len() - 1;
    let lo = edges[0] - settings.intersection_x_tolerance;
    let hi = edges[columns] + settings.intersection_x_tolerance;

    let mut inside: Vec<&TextFragment> = fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .filter(|f| (lo..=hi).contains(&f.center_x()))
        .collect();
    if inside.is_empty() {
        return Err(PageError::GridUnavailable {
            page,
            detail: "no text inside the ruled area".into(),
        });
    }
    inside.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let mut rows: Vec<Vec<&TextFragment>> = Vec::new();
    for fragment in inside {
        match rows.last_mut() {
            Some(row) if (fragment.top - row[0].top).abs() <= settings.snap_y_tolerance => {
                row.push(fragment)
            }
            _ => rows.push(vec![fragment]),
        }
    }

    Ok(rows
        .into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.left.total_cmp(&b.left));
            let mut cells: Row = vec![String::new(); columns];
            for fragment in row {
                let column = edges
                    .partition_point(|&edge| edge <= fragment.center_x())
                    .saturating_sub(1)
                    .min(columns - 1);
                let cell = &mut cells[column];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(fragment.text.trim());
            }
            cells
        })
        .collect())
}

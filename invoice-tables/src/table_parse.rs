use std::collections::HashMap;

use crate::model::{Cell, TextLine};

/// Splits `line` wherever a tab or at least `min_gap` consecutive whitespace
/// characters occur. Cell extents are character offsets into `line`, so a gap
/// left by an empty column stays visible to column alignment.
#[allow(clippy::cast_precision_loss)]
fn split_at_gaps(line: &str, min_gap: usize) -> Vec<Cell> {
    let chars: Vec<char> = line.chars().collect();
    let mut cells = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut gap = 0;

    for (offset, ch) in chars.iter().enumerate() {
        if !ch.is_whitespace() {
            start.get_or_insert(offset);
            end = offset + 1;
            gap = 0;
            continue;
        }

        gap += 1;
        if *ch == '\t' || gap >= min_gap {
            if let Some(first) = start.take() {
                cells.push(Cell {
                    x0: first as f32,
                    x1: end as f32,
                    text: chars[first..end].iter().collect(),
                });
            }
        }
    }

    if let Some(first) = start {
        cells.push(Cell {
            x0: first as f32,
            x1: end as f32,
            text: chars[first..end].iter().collect(),
        });
    }
    cells
}

/// Splits a text line on tabs or on runs of two or more spaces. Single spaces
/// stay inside a cell so that product names like `Blue Widget` survive.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<Cell> {
    split_at_gaps(line, 2)
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<Cell> {
    split_at_gaps(line, 1)
}

/// Whether a cell reads as an amount, quantity or price.
pub(crate) fn looks_numeric(cell: &str) -> bool {
    let cleaned = cell
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .replace(',', "");
    !cleaned.is_empty() && cleaned.parse::<f64>().is_ok()
}

/// Cells for a plain-text line. Single-space separated lines only split into
/// cells when they carry an amount; titles and addresses would otherwise glue
/// onto the table.
fn plain_line_cells(line: &str, min_cols: usize) -> Vec<Cell> {
    let cells = split_line_into_cells(line);
    if cells.len() >= min_cols {
        return cells;
    }

    let soft_cells = soft_split_line_into_cells(line);
    let has_amount = soft_cells.iter().any(|cell| looks_numeric(&cell.text));
    let looks_like_sentence = line.trim_end().ends_with(['.', '!', '?', ':']);
    if soft_cells.len() >= min_cols && has_amount && !looks_like_sentence {
        soft_cells
    } else {
        cells
    }
}

/// Lines of plain extracted text. Blank lines become block boundaries.
pub(crate) fn text_lines(text: &str, min_cols: usize) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut after_blank = false;
    for raw in text.lines() {
        if raw.trim().is_empty() {
            after_blank = true;
            continue;
        }
        lines.push(TextLine {
            cells: plain_line_cells(raw, min_cols),
            starts_block: after_blank,
        });
        after_blank = false;
    }
    lines
}

pub(crate) fn modal_width(widths: &[usize]) -> usize {
    let mut freq = HashMap::new();
    for width in widths {
        *freq.entry(*width).or_insert(0_usize) += 1;
    }

    freq.into_iter()
        .max_by_key(|(width, count)| (*count, *width))
        .map_or(0, |(width, _)| width)
}

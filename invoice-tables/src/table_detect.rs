use tracing::{debug, warn};

use crate::model::{Cell, PageLines, PageTables, RawTable};
use crate::table_parse::modal_width;
use crate::warning::{ExtractWarning, WarningCode};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// How consistently the rows of a run agree on their cell count, before they
/// are aligned to the header.
#[allow(clippy::cast_precision_loss)]
fn table_confidence(widths: &[usize]) -> f32 {
    if widths.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(widths);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        widths.iter().filter(|width| **width == modal).count() as f32 / widths.len() as f32;
    let max_width = widths.iter().copied().max().unwrap_or(modal);
    let min_width = widths.iter().copied().min().unwrap_or(modal);
    let uniformity = 1.0 - ((max_width - min_width) as f32 / max_width as f32);

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

fn overlap(a: &Cell, b: &Cell) -> f32 {
    (a.x1.min(b.x1) - a.x0.max(b.x0)).max(0.0)
}

fn distance(a: &Cell, b: &Cell) -> f32 {
    (a.x0 - b.x1).max(b.x0 - a.x1).max(0.0)
}

/// Header column a cell sits under: the widest horizontal overlap, or the
/// nearest column when nothing overlaps.
fn column_for(header: &[Cell], cell: &Cell) -> usize {
    header
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            overlap(a, cell)
                .total_cmp(&overlap(b, cell))
                .then(distance(b, cell).total_cmp(&distance(a, cell)))
        })
        .map_or(0, |(index, _)| index)
}

/// Places a row's cells under the header columns. Columns left blank in the
/// middle of a row stay as empty strings; trailing blank columns are dropped.
fn align_to_header(header: &[Cell], cells: &[Cell]) -> Vec<String> {
    let mut row = vec![String::new(); header.len()];
    for cell in cells {
        let slot = &mut row[column_for(header, cell)];
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(&cell.text);
    }
    while row.last().is_some_and(String::is_empty) {
        row.pop();
    }
    row
}

fn build_table(page_number: u32, run: &[&[Cell]]) -> Option<RawTable> {
    let (header, data) = run.split_first()?;
    if data.is_empty() {
        return None;
    }

    let widths: Vec<usize> = run.iter().map(|cells| cells.len()).collect();
    let mut rows = Vec::with_capacity(run.len());
    rows.push(header.iter().map(|cell| cell.text.clone()).collect());
    rows.extend(data.iter().map(|cells| align_to_header(header, cells)));

    Some(RawTable {
        page: page_number,
        rows,
        confidence: table_confidence(&widths),
    })
}

fn detect_tables_in_page(page: &PageLines, min_cols: usize) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut run: Vec<&[Cell]> = Vec::new();

    for line in &page.lines {
        let is_row = line.cells.len() >= min_cols;
        if line.starts_block || !is_row {
            tables.extend(build_table(page.page_number, &run));
            run.clear();
        }
        if is_row {
            run.push(&line.cells);
        }
    }

    tables.extend(build_table(page.page_number, &run));
    tables
}

/// Runs table detection over every page, keeping page order and one entry per
/// page even when a page has no tables.
pub(crate) fn detect_tables(
    pages: &[PageLines],
    min_cols: usize,
    warnings: &mut Vec<ExtractWarning>,
) -> Vec<PageTables> {
    let mut detected = Vec::with_capacity(pages.len());
    for page in pages {
        let tables = detect_tables_in_page(page, min_cols.max(2));
        debug!(
            page = page.page_number,
            tables = tables.len(),
            "detected tables"
        );

        for (index, table) in tables.iter().enumerate() {
            if table.confidence < LOW_CONFIDENCE_THRESHOLD {
                warn!(
                    page = table.page,
                    confidence = table.confidence,
                    "low-confidence table"
                );
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::LowConfidence,
                        "rows have inconsistent widths; cells may be misaligned",
                    )
                    .with_page(table.page)
                    .with_table_id(index + 1)
                    .with_confidence(table.confidence),
                );
            }
        }

        detected.push(PageTables {
            page_number: page.page_number,
            tables,
        });
    }
    detected
}

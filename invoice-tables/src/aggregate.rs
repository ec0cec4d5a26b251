use tracing::debug;

use crate::header::HeaderIndex;
use crate::model::PageTables;
use crate::warning::{ExtractWarning, WarningCode};

pub const PRODUCT_COLUMN: &str = "Product";
pub const TOTAL_COLUMN: &str = "Total";
pub const TARGET_PRODUCT: &str = "Doodad";

/// Running counters for one pass over a document's tables.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub sum: f64,
    pub table_count: usize,
    pub eligible_table_count: usize,
    pub matched_rows: usize,
    pub skipped_rows: usize,
}

/// Coerces a `Total` cell to a number. Surrounding whitespace is ignored;
/// anything else that is not a finite decimal is rejected.
#[must_use]
pub fn parse_total(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Sums `Total` over every row whose trimmed `Product` equals `product`.
///
/// Tables without both a `Product` and a `Total` header, or with more than one
/// `Product` column, are skipped whole. Matching rows whose total does not
/// resolve to a single number are skipped one by one, which covers every row
/// of a table that repeats `Total`.
pub fn sum_product_totals(
    pages: &[PageTables],
    product: &str,
    warnings: &mut Vec<ExtractWarning>,
) -> Tally {
    let mut tally = Tally::default();

    for page in pages {
        for (index, table) in page.tables.iter().enumerate() {
            tally.table_count += 1;
            let table_id = index + 1;

            let Some(header) = table.header() else {
                continue;
            };

            let columns = HeaderIndex::from_header(header);
            if !columns.contains(PRODUCT_COLUMN) || !columns.contains(TOTAL_COLUMN) {
                debug!(page = page.page_number, table_id, ?header, "skipping table");
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::IneligibleTable,
                        format!("table lacks a '{PRODUCT_COLUMN}' or '{TOTAL_COLUMN}' column"),
                    )
                    .with_page(page.page_number)
                    .with_table_id(table_id),
                );
                continue;
            }
            if columns.is_duplicated(PRODUCT_COLUMN) {
                debug!(page = page.page_number, table_id, ?header, "ambiguous product column");
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::IneligibleTable,
                        format!("table has more than one '{PRODUCT_COLUMN}' column"),
                    )
                    .with_page(page.page_number)
                    .with_table_id(table_id),
                );
                continue;
            }
            tally.eligible_table_count += 1;

            for (row_number, cells) in table.data_rows().iter().enumerate() {
                let row = columns.name_row(cells);
                if row.get(PRODUCT_COLUMN).map(str::trim) != Some(product) {
                    continue;
                }

                match row.get(TOTAL_COLUMN).and_then(parse_total) {
                    Some(total) => {
                        tally.sum += total;
                        tally.matched_rows += 1;
                    }
                    None => {
                        debug!(
                            page = page.page_number,
                            table_id,
                            row = row_number + 1,
                            total = ?row.get(TOTAL_COLUMN),
                            "total is not numeric"
                        );
                        tally.skipped_rows += 1;
                    }
                }
            }
        }
    }

    tally
}

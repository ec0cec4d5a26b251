mod aggregate;
mod csv_out;
mod error;
mod header;
mod layout;
mod model;
mod options;
mod pdf_reader;
mod table_detect;
mod table_parse;
mod warning;

use std::io::Write;

use tracing::info;

use crate::model::PageLines;
use crate::pdf_reader::{document_text, read_pdf_pages_from_bytes};
use crate::table_detect::detect_tables;
use crate::table_parse::text_lines;

pub use aggregate::{
    PRODUCT_COLUMN, TARGET_PRODUCT, TOTAL_COLUMN, Tally, parse_total, sum_product_totals,
};
pub use error::{AnalyzeError, ExtractError};
pub use header::{HeaderIndex, NamedRow};
pub use model::{PageTables, RawTable};
pub use options::{AnalyzeOptions, PageSelection};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct TableExtraction {
    /// Pages read from the document, after any page selection.
    pub page_count: usize,
    pub pages: Vec<PageTables>,
    pub warnings: Vec<ExtractWarning>,
}

impl TableExtraction {
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|page| page.tables.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub sum: f64,
    pub page_count: usize,
    pub table_count: usize,
    pub eligible_table_count: usize,
    pub matched_rows: usize,
    pub skipped_rows: usize,
    pub warnings: Vec<ExtractWarning>,
}

/// Upload names must end in `.pdf`, compared case-sensitively.
pub fn validate_filename(filename: &str) -> Result<(), AnalyzeError> {
    if filename.ends_with(".pdf") {
        Ok(())
    } else {
        Err(AnalyzeError::InvalidFileType {
            filename: filename.to_string(),
        })
    }
}

/// Reads a PDF from memory and detects the tables on each page.
pub fn extract_tables_from_bytes(
    input_pdf: &[u8],
    options: &AnalyzeOptions,
) -> Result<TableExtraction, ExtractError> {
    if options.min_cols < 2 {
        return Err(ExtractError::InvalidOption(
            "min_cols must be at least 2".to_string(),
        ));
    }

    let page_lines =
        read_pdf_pages_from_bytes(input_pdf, options.pages.as_ref(), options.min_cols)?;
    let page_count = page_lines.len();
    let mut warnings = Vec::new();
    let mut pages = detect_tables(&page_lines, options.min_cols, &mut warnings);

    let found_any = pages.iter().any(|page| !page.tables.is_empty());
    if !found_any && options.pages.is_none() {
        if let Some(full_text) = document_text(input_pdf) {
            let document_page = PageLines {
                page_number: 1,
                lines: text_lines(&full_text, options.min_cols),
            };
            let retried = detect_tables(&[document_page], options.min_cols, &mut warnings);
            if retried.iter().any(|page| !page.tables.is_empty()) {
                info!("no page-level tables; using document-level text");
                pages = retried;
            }
        }
    }

    if pages.iter().all(|page| page.tables.is_empty()) {
        warnings.push(ExtractWarning::new(
            warning::WarningCode::NoTablesDetected,
            "no tables were detected in the selected pages",
        ));
    }

    Ok(TableExtraction {
        page_count,
        pages,
        warnings,
    })
}

/// Sums the `Total` column of every `Doodad` row in an uploaded invoice.
pub fn analyze_invoice(input_pdf: &[u8], filename: &str) -> Result<AnalysisReport, AnalyzeError> {
    analyze_invoice_with_options(input_pdf, filename, &AnalyzeOptions::default())
}

pub fn analyze_invoice_with_options(
    input_pdf: &[u8],
    filename: &str,
    options: &AnalyzeOptions,
) -> Result<AnalysisReport, AnalyzeError> {
    validate_filename(filename)?;

    let TableExtraction {
        page_count,
        pages,
        mut warnings,
    } = extract_tables_from_bytes(input_pdf, options)?;
    let tally = sum_product_totals(&pages, &options.product, &mut warnings);

    info!(
        filename,
        sum = tally.sum,
        pages = page_count,
        tables = tally.table_count,
        eligible = tally.eligible_table_count,
        matched = tally.matched_rows,
        "invoice analyzed"
    );

    Ok(AnalysisReport {
        sum: tally.sum,
        page_count,
        table_count: tally.table_count,
        eligible_table_count: tally.eligible_table_count,
        matched_rows: tally.matched_rows,
        skipped_rows: tally.skipped_rows,
        warnings,
    })
}

/// Writes the detected tables as CSV, returning the number of records.
pub fn write_tables_csv<W: Write>(
    target: W,
    extraction: &TableExtraction,
    delimiter: u8,
) -> Result<usize, ExtractError> {
    csv_out::write_tables_csv(target, &extraction.pages, delimiter)
}

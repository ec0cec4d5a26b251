use std::cell::OnceCell;

use lopdf::Document;
use tracing::debug;

use crate::error::ExtractError;
use crate::layout::{looks_garbled, page_lines};
use crate::model::PageLines;
use crate::options::PageSelection;
use crate::table_parse::text_lines;

/// Whole-document text from `pdf-extract`, or `None` when it cannot read the
/// file. Used when the content streams give nothing usable.
pub(crate) fn document_text(input_pdf: &[u8]) -> Option<String> {
    pdf_extract::extract_text_from_mem(input_pdf)
        .inspect_err(|error| debug!(%error, "pdf-extract could not read the document"))
        .ok()
        .filter(|text| !text.trim().is_empty())
}

/// `pdf-extract` separates pages with form feeds.
fn page_texts(document_text: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = document_text.split('\u{000C}').collect();
    if pages.last().is_some_and(|last| last.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Loads a PDF from memory and lays out the text of each selected page.
///
/// Lines come from the page's content stream. A page with no positioned text,
/// or with text that did not decode, falls back to its `pdf-extract` text
/// when that text splits into the same number of pages as the document.
///
/// A document without pages is not an error unless an explicit selection was
/// given and matched nothing.
pub(crate) fn read_pdf_pages_from_bytes(
    input_pdf: &[u8],
    page_selection: Option<&PageSelection>,
    min_cols: usize,
) -> Result<Vec<PageLines>, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    let page_ids = document.get_pages();
    let fallback_text = OnceCell::new();

    let mut pages = Vec::new();
    for (index, (page_number, page_id)) in page_ids.iter().enumerate() {
        if page_selection.is_some_and(|selection| !selection.contains(*page_number)) {
            continue;
        }

        let mut lines = page_lines(&document, *page_id);
        if lines.is_empty() || looks_garbled(&lines) {
            let fallback = fallback_text
                .get_or_init(|| document_text(input_pdf))
                .as_deref()
                .map(page_texts)
                .filter(|texts| texts.len() == page_ids.len())
                .and_then(|texts| texts.get(index).map(|text| text_lines(text, min_cols)));
            if let Some(plain) = fallback {
                debug!(page = page_number, "using pdf-extract text for page");
                lines = plain;
            }
        }

        debug!(page = page_number, lines = lines.len(), "laid out page");
        pages.push(PageLines {
            page_number: *page_number,
            lines,
        });
    }

    if pages.is_empty() && page_selection.is_some() {
        return Err(ExtractError::NoPagesSelected);
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::{page_texts, read_pdf_pages_from_bytes};
    use crate::error::ExtractError;

    #[test]
    fn form_feeds_separate_pages() {
        assert_eq!(page_texts("p1\u{000C}p2\u{000C}\n"), vec!["p1", "p2"]);
        assert_eq!(page_texts("only"), vec!["only"]);
    }

    #[test]
    fn rejects_bytes_that_are_not_a_pdf() {
        let error = read_pdf_pages_from_bytes(b"definitely not a pdf", None, 2)
            .expect_err("garbage should not load");
        assert!(matches!(error, ExtractError::PdfLoad(_)));
    }
}

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("invalid page selection: {0}")]
    InvalidPageSelection(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}

/// Failures that abort an invoice analysis. Row-level coercion problems never
/// show up here.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("File must be a PDF (got '{filename}')")]
    InvalidFileType { filename: String },

    #[error("Error processing PDF: {0}")]
    Processing(#[from] ExtractError),
}

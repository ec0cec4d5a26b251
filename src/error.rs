use std::fmt::{Display, Formatter};

use invoice_tables::AnalyzeError;
use worker::{Response, Result};

use crate::models::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    InvalidFileType(String),
    Validation(String),
    PayloadTooLarge(String),
    Processing(String),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFileType(_) => "invalid_file_type",
            Self::Validation(_) => "validation_error",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Processing(_) => "processing_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidFileType(message)
            | Self::Validation(message)
            | Self::PayloadTooLarge(message)
            | Self::Processing(message)
            | Self::Internal(message) => message,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidFileType(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::Validation(_) => 422,
            Self::Processing(_) | Self::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message().to_string(),
        }
    }

    pub fn into_response(self) -> Result<Response> {
        let mut response = Response::from_json(&self.body())?;
        response.headers_mut().set("Cache-Control", "no-store")?;
        Ok(response.with_status(self.status_code()))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<AnalyzeError> for ApiError {
    fn from(error: AnalyzeError) -> Self {
        match error {
            AnalyzeError::InvalidFileType { .. } => {
                Self::InvalidFileType("File must be a PDF".to_string())
            }
            AnalyzeError::Processing(_) => Self::Processing(error.to_string()),
        }
    }
}

impl From<worker::Error> for ApiError {
    fn from(error: worker::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

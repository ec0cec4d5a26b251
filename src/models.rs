use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "FinSight Invoice Analyzer API";
pub const UPLOAD_FIELD: &str = "file";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "*";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SumResponse {
    pub sum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

use pretty_assertions::assert_eq;

use finsight_invoice_worker::config::AppConfig;
use finsight_invoice_worker::error::ApiError;
use finsight_invoice_worker::models::{
    DEFAULT_MAX_UPLOAD_BYTES, ErrorResponse, SumResponse,
};
use finsight_invoice_worker::routes::{analyze_bytes, check_upload_size, root_response};
use invoice_tables::AnalyzeError;

fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |key: &str| {
        vars.iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| (*value).to_string())
    }
}

#[test]
fn wrong_extension_maps_to_bad_request() {
    let error = analyze_bytes(b"%PDF-1.5", "invoice.txt").expect_err("txt must be rejected");

    assert_eq!(error.status_code(), 400);
    assert_eq!(
        error.body(),
        ErrorResponse {
            code: "invalid_file_type".to_string(),
            message: "File must be a PDF".to_string(),
        }
    );
}

#[test]
fn extension_check_is_case_sensitive() {
    let error = analyze_bytes(b"%PDF-1.5", "INVOICE.PDF").expect_err("upper-case suffix");
    assert_eq!(error.code(), "invalid_file_type");
}

#[test]
fn corrupt_pdf_maps_to_server_error_with_cause() {
    let error = analyze_bytes(b"these bytes are not a pdf", "invoice.pdf")
        .expect_err("garbage must fail");

    assert_eq!(error.status_code(), 500);
    assert_eq!(error.code(), "processing_error");
    assert!(
        error.message().starts_with("Error processing PDF: failed to load PDF"),
        "unexpected message: {}",
        error.message()
    );
}

#[test]
fn analyze_error_conversion_keeps_taxonomy() {
    let invalid: ApiError = AnalyzeError::InvalidFileType {
        filename: "notes.docx".to_string(),
    }
    .into();
    assert_eq!(invalid.status_code(), 400);

    let processing: ApiError =
        AnalyzeError::Processing(invoice_tables::ExtractError::NoPagesSelected).into();
    assert_eq!(processing.status_code(), 500);
    assert_eq!(
        processing.message(),
        "Error processing PDF: no pages available after applying selection"
    );
}

#[test]
fn upload_limit_is_enforced() {
    assert!(check_upload_size(10, 10).is_ok());

    let error = check_upload_size(11, 10).expect_err("oversized upload");
    assert_eq!(error.status_code(), 413);
    assert_eq!(error.code(), "payload_too_large");
}

#[test]
fn config_defaults_when_vars_are_missing() {
    let config = AppConfig::from_lookup(lookup(&[]));
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.allowed_origins, vec!["*".to_string()]);
    assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
}

#[test]
fn config_reads_origins_and_upload_limit() {
    let config = AppConfig::from_lookup(lookup(&[
        ("ALLOWED_ORIGINS", "https://finsight.example, https://admin.finsight.example,"),
        ("MAX_UPLOAD_BYTES", " 2048 "),
    ]));

    assert_eq!(
        config.allowed_origins,
        vec![
            "https://finsight.example".to_string(),
            "https://admin.finsight.example".to_string(),
        ]
    );
    assert_eq!(config.max_upload_bytes, 2048);
}

#[test]
fn config_ignores_unusable_values() {
    let config = AppConfig::from_lookup(lookup(&[
        ("ALLOWED_ORIGINS", " , "),
        ("MAX_UPLOAD_BYTES", "lots"),
    ]));
    assert_eq!(config, AppConfig::default());

    let zero = AppConfig::from_lookup(lookup(&[("MAX_UPLOAD_BYTES", "0")]));
    assert_eq!(zero.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
}

#[test]
fn response_shapes_match_the_api() {
    let sum = serde_json::to_value(SumResponse { sum: 12.75 }).expect("serialize sum");
    assert_eq!(sum, serde_json::json!({ "sum": 12.75 }));

    let root = serde_json::to_value(root_response()).expect("serialize root");
    assert_eq!(
        root,
        serde_json::json!({ "message": "FinSight Invoice Analyzer API" })
    );
}

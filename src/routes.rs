use invoice_tables::{analyze_invoice, validate_filename};
use serde::Serialize;
use worker::{
    Context, Cors, Env, FormEntry, Method, Request, Response, Result, RouteContext, Router,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{RootResponse, SERVICE_NAME, SumResponse, UPLOAD_FIELD};

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let config = AppConfig::from_env(&env);
    let cors = cors_policy(&config);

    let response = Router::with_data(config)
        .get("/", root_route)
        .post_async("/analyze", analyze_route)
        .options("/analyze", preflight_route)
        .run(req, env)
        .await?;
    response.with_cors(&cors)
}

pub fn cors_policy(config: &AppConfig) -> Cors {
    Cors::new()
        .with_origins(config.allowed_origins.clone())
        .with_methods(Method::all())
        .with_allowed_headers(["*"])
        .with_credentials(true)
}

fn root_route(_req: Request, _ctx: RouteContext<AppConfig>) -> Result<Response> {
    json_response(&root_response())
}

fn preflight_route(_req: Request, _ctx: RouteContext<AppConfig>) -> Result<Response> {
    Ok(Response::empty()?.with_status(204))
}

async fn analyze_route(mut req: Request, ctx: RouteContext<AppConfig>) -> Result<Response> {
    match analyze_response(&mut req, &ctx.data).await {
        Ok(response) => json_response(&response),
        Err(error) => {
            if error.status_code() >= 500 {
                worker::console_error!("invoice analysis failed: {error}");
            }
            error.into_response()
        }
    }
}

async fn analyze_response(req: &mut Request, config: &AppConfig) -> Result<SumResponse, ApiError> {
    let form = req.form_data().await.map_err(|error| {
        ApiError::Validation(format!("expected a multipart/form-data body: {error}"))
    })?;

    let file = match form.get(UPLOAD_FIELD) {
        Some(FormEntry::File(file)) => file,
        Some(FormEntry::Field(_)) => {
            return Err(ApiError::Validation(format!(
                "field '{UPLOAD_FIELD}' must be a file upload"
            )));
        }
        None => {
            return Err(ApiError::Validation(format!(
                "missing upload field '{UPLOAD_FIELD}'"
            )));
        }
    };

    let filename = file.name();
    validate_filename(&filename)?;
    check_upload_size(file.size(), config.max_upload_bytes)?;

    let pdf_bytes = file.bytes().await?;
    let response = analyze_bytes(&pdf_bytes, &filename)?;
    worker::console_log!(
        "invoice analyzed: file={}, bytes={}, sum={}",
        filename,
        pdf_bytes.len(),
        response.sum
    );
    Ok(response)
}

pub fn root_response() -> RootResponse {
    RootResponse {
        message: SERVICE_NAME.to_string(),
    }
}

pub fn check_upload_size(size: usize, limit: usize) -> Result<(), ApiError> {
    if size > limit {
        return Err(ApiError::PayloadTooLarge(format!(
            "upload is {size} bytes; the limit is {limit} bytes"
        )));
    }
    Ok(())
}

/// Runs the aggregation over a fully received upload.
pub fn analyze_bytes(pdf_bytes: &[u8], filename: &str) -> Result<SumResponse, ApiError> {
    let report = analyze_invoice(pdf_bytes, filename)?;
    Ok(SumResponse { sum: report.sum })
}

fn json_response<T>(payload: &T) -> Result<Response>
where
    T: Serialize,
{
    let mut response = Response::from_json(payload)?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

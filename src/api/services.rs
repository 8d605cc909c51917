use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, Response},
};

use super::{
    error::ApiError,
    models::{GhostscriptStatus, HealthResponse},
    state::AppState,
    utils::{UploadForm, attachment},
};
use crate::handlers::{
    self, CompressionLevel, ConversionResult, HandlerError, RewriteCompressor, select_compressor,
};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Image conversion endpoint (POST /convert-image)
///
/// Form fields: `file` (png/jpg/jpeg/webp upload) and `format` (png/jpg/jpeg/webp).
/// Decoding and encoding run on the blocking pool. A body that is not multipart at
/// all is treated as a form without a file.
pub async fn convert_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart.map_err(|_| ApiError::NoFileUploaded)?).await?;
    let upload = form.required_file("file")?;
    let format = form.field("format").map(str::to_string);

    let outcome = tokio::task::spawn_blocking(move || {
        handlers::convert_image(&upload, format.as_deref())
    })
    .await
    .map_err(HandlerError::from)
    .and_then(|result| result);

    record(&state, outcome).map(attachment)
}

/// PDF compression endpoint (POST /compress-pdf)
///
/// Form fields: `file` (PDF upload) and optional `level`. Ghostscript is looked up
/// per request (or once, when lookup caching is on); without it the in-process
/// rewrite is used.
pub async fn compress_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart.map_err(|_| ApiError::NoFileUploaded)?).await?;
    let upload = form.required_file("file")?;
    let level = CompressionLevel::from_token(form.field("level"));

    let compressor = select_compressor(&state.locator, &state.config.compression);
    let outcome = handlers::compress_pdf(&upload, level, compressor.as_ref()).await;

    if outcome.is_ok() && compressor.name() == RewriteCompressor::NAME {
        state.metrics.compression_fallback();
    }

    record(&state, outcome).map(attachment)
}

/// PDF merge endpoint (POST /merge-pdf)
///
/// Form field: `files[]`, repeated; pages are appended in submission order.
pub async fn merge_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart.map_err(|_| ApiError::NoFilesUploaded)?).await?;
    let uploads = form.required_files("files[]")?;

    let outcome = tokio::task::spawn_blocking(move || handlers::merge_pdfs(&uploads))
        .await
        .map_err(HandlerError::from)
        .and_then(|result| result);

    record(&state, outcome).map(attachment)
}

/// OPTIONS on the upload routes: 200 with an empty body
///
/// With the CORS layer mounted, preflights are answered before reaching this.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let path = state.locator.locate();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ghostscript: GhostscriptStatus {
            available: path.is_some(),
            path: path.map(|p| p.display().to_string()),
        },
        metrics: state.metrics.snapshot(),
    })
}

fn record(
    state: &AppState,
    outcome: Result<ConversionResult, HandlerError>,
) -> Result<ConversionResult, ApiError> {
    match outcome {
        Ok(result) => {
            state.metrics.conversion_completed();
            Ok(result)
        }
        Err(e) => {
            state.metrics.conversion_failed();
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preflight_is_plain_ok() {
        assert_eq!(preflight().await, StatusCode::OK);
    }

    #[test]
    fn handler_failures_are_counted() {
        let state = AppState::new(crate::config::Config::default());

        let ok = record(&state, Ok(ConversionResult::pdf(Vec::new(), "merged.pdf")));
        assert!(ok.is_ok());
        let err = record(&state, Err(HandlerError::EmptyBatch));
        assert!(matches!(err, Err(ApiError::NoFilesSelected)));

        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.conversions_completed, 1);
        assert_eq!(snapshot.conversions_failed, 1);
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let Html(page) = index().await;
        assert!(page.contains("/merge-pdf"));
    }
}

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::handlers::HandlerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFileUploaded,
    #[error("No file selected")]
    NoFileSelected,
    #[error("No files uploaded")]
    NoFilesUploaded,
    #[error("No files selected")]
    NoFilesSelected,
    #[error("Unsupported file type")]
    UnsupportedFileType,
    #[error("Unsupported target format")]
    UnsupportedTargetFormat,
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    #[error("{message}")]
    Multipart { status: StatusCode, message: String },
    #[error("{0}")]
    Processing(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFileUploaded
            | ApiError::NoFileSelected
            | ApiError::NoFilesUploaded
            | ApiError::NoFilesSelected
            | ApiError::UnsupportedTargetFormat
            | ApiError::InvalidFileType(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Multipart { status, .. } => *status,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoFileUploaded | ApiError::NoFilesUploaded => "NO_UPLOAD",
            ApiError::NoFileSelected | ApiError::NoFilesSelected => "NO_SELECTION",
            ApiError::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ApiError::UnsupportedTargetFormat => "UNSUPPORTED_TARGET_FORMAT",
            ApiError::InvalidFileType(_) => "INVALID_FILE_TYPE",
            ApiError::Multipart { .. } => "MALFORMED_MULTIPART",
            ApiError::Processing(_) => "PROCESSING_FAILED",
        }
    }

    /// Merge extension failures and processing failures answer in plain text;
    /// every other error is a JSON `{"error": ...}` object
    fn is_plain_text(&self) -> bool {
        matches!(self, ApiError::InvalidFileType(_) | ApiError::Processing(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        if self.is_plain_text() {
            return (status, self.to_string()).into_response();
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<HandlerError> for ApiError {
    fn from(value: HandlerError) -> Self {
        match value {
            HandlerError::UnsupportedFileType => ApiError::UnsupportedFileType,
            HandlerError::UnsupportedTargetFormat(_) => ApiError::UnsupportedTargetFormat,
            HandlerError::InvalidFileType(filename) => ApiError::InvalidFileType(filename),
            HandlerError::EmptyBatch => ApiError::NoFilesSelected,
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        ApiError::Multipart {
            status: value.status(),
            message: value.body_text(),
        }
    }
}

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::types::CompressionLevel;

/// Errors raised while validating or transforming an upload
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Unsupported file type")]
    UnsupportedFileType,
    #[error("Unsupported target format")]
    UnsupportedTargetFormat(String),
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    #[error("No files selected")]
    EmptyBatch,
    #[error("Ghostscript failed (rc={}): {stderr}", exit_code_label(.code))]
    ToolFailed { code: Option<i32>, stderr: String },
    #[error("Ghostscript timed out after {}s", .0.as_secs())]
    ToolTimeout(Duration),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Pdf(#[from] lopdf::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Encode(String),
    #[error("worker task failed: {0}")]
    Task(String),
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl From<tokio::task::JoinError> for HandlerError {
    fn from(value: tokio::task::JoinError) -> Self {
        HandlerError::Task(value.to_string())
    }
}

/// Strategy for shrinking a PDF
///
/// Implemented by the Ghostscript-backed compressor and by the in-process
/// re-serialization used when no Ghostscript executable is available.
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Produce a compressed copy of `input`
    async fn compress(
        &self,
        input: &[u8],
        level: CompressionLevel,
    ) -> Result<Vec<u8>, HandlerError>;
}

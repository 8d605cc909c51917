use async_trait::async_trait;
use lopdf::Document;
use tracing::{info, warn};

use super::ghostscript::{GhostscriptCompressor, GhostscriptLocator};
use super::merge::assemble;
use super::traits::{HandlerError, PdfCompressor};
use super::types::{CompressionLevel, ConversionResult, UploadedFile};
use super::validation::allowed_pdf_file;
use crate::config::CompressionConfig;
use crate::humanize::ByteSize;

pub const COMPRESSED_FILENAME: &str = "compressed.pdf";

/// In-process fallback: rebuild the page tree and deflate every stream
///
/// Gives little or no size reduction (nothing is resampled); the guarantee is a
/// structurally valid PDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct RewriteCompressor;

impl RewriteCompressor {
    pub const NAME: &'static str = "rewrite";

    pub fn rewrite(input: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let source = Document::load_mem(input)?;
        let mut document = assemble(vec![source])?;
        document.compress();

        let mut output = Vec::with_capacity(input.len());
        document.save_to(&mut output)?;
        Ok(output)
    }
}

#[async_trait]
impl PdfCompressor for RewriteCompressor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn compress(
        &self,
        input: &[u8],
        _level: CompressionLevel,
    ) -> Result<Vec<u8>, HandlerError> {
        let input = input.to_vec();
        tokio::task::spawn_blocking(move || Self::rewrite(&input)).await?
    }
}

/// Pick Ghostscript when the locator finds it, the rewrite fallback otherwise
pub fn select_compressor(
    locator: &GhostscriptLocator,
    config: &CompressionConfig,
) -> Box<dyn PdfCompressor> {
    match locator.locate() {
        Some(executable) => Box::new(
            GhostscriptCompressor::new(executable)
                .with_timeout(config.timeout())
                .with_scratch_root(config.scratch_dir.clone()),
        ),
        None => Box::new(RewriteCompressor),
    }
}

/// Validate and compress one uploaded PDF
pub async fn compress_pdf(
    upload: &UploadedFile,
    level: CompressionLevel,
    compressor: &dyn PdfCompressor,
) -> Result<ConversionResult, HandlerError> {
    if !allowed_pdf_file(&upload.filename) {
        return Err(HandlerError::UnsupportedFileType);
    }

    let output = compressor
        .compress(&upload.data, level)
        .await
        .inspect_err(|e| warn!(backend = compressor.name(), error = %e, "PDF compression failed"))?;

    info!(
        backend = compressor.name(),
        %level,
        input = %ByteSize::from(upload.data.len()),
        output = %ByteSize::from(output.len()),
        "Compressed PDF"
    );

    Ok(ConversionResult::pdf(output, COMPRESSED_FILENAME))
}

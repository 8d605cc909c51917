//! File transformations behind the HTTP endpoints
//!
//! Everything here works on in-memory uploads and knows nothing about HTTP.
//!
//! ## Key Components
//!
//! - [`convert_image`] - Re-encode a raster image as PNG, JPEG or WebP
//! - [`compress_pdf`] - Shrink a PDF through a [`PdfCompressor`]
//! - [`GhostscriptCompressor`] - External Ghostscript backend
//! - [`RewriteCompressor`] - In-process fallback when Ghostscript is missing
//! - [`merge_pdfs`] - Concatenate PDFs in submission order
//!
//! ## Example
//!
//! ```rust,ignore
//! use convertbox::handlers::{select_compressor, compress_pdf, CompressionLevel};
//!
//! let compressor = select_compressor(&locator, &config.compression);
//! let result = compress_pdf(&upload, CompressionLevel::Ebook, compressor.as_ref()).await?;
//! ```

mod compress;
mod ghostscript;
mod image;
mod merge;
mod traits;
pub(crate) mod types;
mod validation;

pub use compress::{COMPRESSED_FILENAME, RewriteCompressor, compress_pdf, select_compressor};
pub use ghostscript::{GhostscriptCompressor, GhostscriptLocator, GsCommand};
pub use image::convert_image;
pub use merge::{MERGED_FILENAME, assemble, merge_pdfs};
pub use traits::{HandlerError, PdfCompressor};
pub use types::{CompressionLevel, ConversionResult, ImageTarget, TargetFormat, UploadedFile};
pub use validation::{
    ALLOWED_IMAGE_EXTENSIONS, ALLOWED_PDF_EXTENSIONS, allowed_image_file, allowed_pdf_file,
};

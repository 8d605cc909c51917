//! Image format conversion
//!
//! Decodes an upload, normalizes its color mode for the target encoding and
//! re-encodes it with fixed quality settings. Palette images are expanded by the
//! decoder itself: palettes with a transparency chunk become RGBA, others RGB, so
//! the only normalization left here is dropping alpha for JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use tracing::debug;

use super::traits::HandlerError;
use super::types::{ConversionResult, ImageTarget, TargetFormat, UploadedFile};
use super::validation::allowed_image_file;

const JPEG_QUALITY: u8 = 85;
const WEBP_QUALITY: f32 = 85.0;

/// Convert `upload` to the encoding named by `format`
///
/// The extension check runs before the target token is looked at, so a bad
/// upload is reported as an unsupported file even when the format is bad too.
pub fn convert_image(
    upload: &UploadedFile,
    format: Option<&str>,
) -> Result<ConversionResult, HandlerError> {
    if !allowed_image_file(&upload.filename) {
        return Err(HandlerError::UnsupportedFileType);
    }

    let target: TargetFormat = format.unwrap_or_default().parse()?;

    let source = image::load_from_memory(&upload.data)?;
    let (width, height) = source.dimensions();
    debug!(
        filename = %upload.filename,
        content_type = upload.content_type.as_deref().unwrap_or("unknown"),
        color = ?source.color(),
        width,
        height,
        target = target.token(),
        "Decoded source image"
    );

    let prepared = normalize_for_target(source, target.kind());
    let data = encode(&prepared, target.kind())?;

    Ok(ConversionResult {
        data,
        filename: format!("{}.{}", upload.stem(), target.token()),
        mime: target.mime(),
    })
}

/// JPEG has no alpha channel; everything else keeps the decoded mode
fn normalize_for_target(image: DynamicImage, target: ImageTarget) -> DynamicImage {
    match target {
        ImageTarget::Jpeg if image.color().has_alpha() => {
            DynamicImage::ImageRgb8(flatten_onto_white(&image))
        }
        ImageTarget::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageTarget::Png | ImageTarget::WebP => image,
    }
}

/// Composite over opaque white using the alpha channel as mask
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();

    ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend =
            |channel: u8| ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode(image: &DynamicImage, target: ImageTarget) -> Result<Vec<u8>, HandlerError> {
    let mut buffer = Vec::new();

    match target {
        ImageTarget::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            image.write_with_encoder(encoder)?;
        }
        ImageTarget::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut buffer,
                CompressionType::Best,
                FilterType::Adaptive,
            );
            image.write_with_encoder(encoder)?;
        }
        ImageTarget::WebP => buffer = encode_webp(image)?,
    }

    Ok(buffer)
}

/// Lossy WebP via libwebp, which only takes 8-bit RGB or RGBA input
fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, HandlerError> {
    let (width, height) = image.dimensions();

    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(&rgba, width, height).encode_simple(false, WEBP_QUALITY)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(&rgb, width, height).encode_simple(false, WEBP_QUALITY)
    };

    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| HandlerError::Encode(format!("WebP encoding failed: {e:?}")))
}

use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::traits::HandlerError;

/// One file part from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied name; empty when the form field carried no file
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn has_filename(&self) -> bool {
        !self.filename.is_empty()
    }

    /// Filename without its last extension, `converted` when nothing usable remains
    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("converted")
    }
}

/// Bytes plus download metadata handed back to the HTTP layer
#[derive(Debug)]
pub struct ConversionResult {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime: mime::Mime,
}

impl ConversionResult {
    pub fn pdf(data: Vec<u8>, filename: &str) -> Self {
        Self {
            data,
            filename: filename.to_string(),
            mime: mime::APPLICATION_PDF,
        }
    }
}

/// Image encodings accepted as conversion targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    Png,
    Jpeg,
    WebP,
}

/// A parsed target token; the spelling is kept because it becomes the output extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFormat {
    token: String,
    kind: ImageTarget,
}

impl TargetFormat {
    pub fn kind(&self) -> ImageTarget {
        self.kind
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn mime(&self) -> mime::Mime {
        match self.kind {
            ImageTarget::Png => mime::IMAGE_PNG,
            ImageTarget::Jpeg => mime::IMAGE_JPEG,
            ImageTarget::WebP => "image/webp"
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        }
    }
}

impl FromStr for TargetFormat {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        let kind = match token.as_str() {
            "png" => ImageTarget::Png,
            "jpg" | "jpeg" => ImageTarget::Jpeg,
            "webp" => ImageTarget::WebP,
            _ => return Err(HandlerError::UnsupportedTargetFormat(s.to_string())),
        };
        Ok(Self { token, kind })
    }
}

/// Ghostscript quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Screen,
    #[default]
    Ebook,
    Printer,
    Prepress,
}

impl CompressionLevel {
    /// Unknown or missing tokens fall back to [`CompressionLevel::Ebook`]
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("screen") => Self::Screen,
            Some("printer") => Self::Printer,
            Some("prepress") => Self::Prepress,
            _ => Self::Ebook,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Ebook => "ebook",
            Self::Printer => "printer",
            Self::Prepress => "prepress",
        }
    }

    /// Value for `-dPDFSETTINGS`
    pub fn pdf_settings(&self) -> &'static str {
        match self {
            Self::Screen => "/screen",
            Self::Ebook => "/ebook",
            Self::Printer => "/printer",
            Self::Prepress => "/prepress",
        }
    }

    /// Raster resolution to downsample to; prepress keeps source resolution
    pub fn downsample_dpi(&self) -> Option<u32> {
        match self {
            Self::Screen => Some(72),
            Self::Ebook => Some(100),
            Self::Printer => Some(150),
            Self::Prepress => None,
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_is_case_insensitive() {
        let format: TargetFormat = "JPEG".parse().unwrap();
        assert_eq!(format.kind(), ImageTarget::Jpeg);
        assert_eq!(format.token(), "jpeg");
        assert_eq!(format.mime(), mime::IMAGE_JPEG);

        let format: TargetFormat = "WebP".parse().unwrap();
        assert_eq!(format.kind(), ImageTarget::WebP);
        assert_eq!(format.mime().essence_str(), "image/webp");
    }

    #[test]
    fn target_format_rejects_unknown_tokens() {
        assert!(matches!(
            "gif".parse::<TargetFormat>(),
            Err(HandlerError::UnsupportedTargetFormat(_))
        ));
        assert!("".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn compression_level_defaults_and_coerces() {
        assert_eq!(CompressionLevel::from_token(None), CompressionLevel::Ebook);
        assert_eq!(
            CompressionLevel::from_token(Some("invalid-token")),
            CompressionLevel::Ebook
        );
        assert_eq!(
            CompressionLevel::from_token(Some("Screen")),
            CompressionLevel::Screen
        );
        assert_eq!(
            CompressionLevel::from_token(Some("prepress")),
            CompressionLevel::Prepress
        );
    }

    #[test]
    fn compression_level_presets() {
        assert_eq!(CompressionLevel::Screen.pdf_settings(), "/screen");
        assert_eq!(CompressionLevel::Screen.downsample_dpi(), Some(72));
        assert_eq!(CompressionLevel::Ebook.downsample_dpi(), Some(100));
        assert_eq!(CompressionLevel::Printer.downsample_dpi(), Some(150));
        assert_eq!(CompressionLevel::Prepress.downsample_dpi(), None);
    }

    #[test]
    fn stem_strips_last_extension_only() {
        assert_eq!(UploadedFile::new("photo.PNG", Bytes::new()).stem(), "photo");
        assert_eq!(UploadedFile::new("a.b.webp", Bytes::new()).stem(), "a.b");
        assert_eq!(UploadedFile::new("", Bytes::new()).stem(), "converted");
    }
}

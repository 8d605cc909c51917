//! API utility functions
//!
//! Multipart form collection and attachment responses, kept apart from
//! services.rs so they can be unit tested without a router.

use axum::{
    extract::Multipart,
    http::{
        HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::api::error::ApiError;
use crate::handlers::{ConversionResult, UploadedFile};

/// RFC 5987 `attr-char`: everything else is percent-encoded in `filename*`
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// A fully buffered multipart form
///
/// Parts that carry a filename (even an empty one) are files; the rest are text
/// fields. Repeated names keep submission order.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<(String, UploadedFile)>,
    fields: Vec<(String, String)>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    let mut upload = UploadedFile::new(filename, data);
                    upload.content_type = content_type;
                    form.files.push((name, upload));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.push((name, value));
                }
            }
        }

        Ok(form)
    }

    /// Every file submitted under `name`, in order
    pub fn files(&self, name: &str) -> Vec<UploadedFile> {
        self.files
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, upload)| upload.clone())
            .collect()
    }

    /// First file submitted under `name`
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, upload)| upload)
    }

    /// First text value submitted under `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// The single upload expected under `name`, rejecting absent or unnamed files
    pub fn required_file(&self, name: &str) -> Result<UploadedFile, ApiError> {
        let upload = self.file(name).ok_or(ApiError::NoFileUploaded)?;
        if !upload.has_filename() {
            return Err(ApiError::NoFileSelected);
        }
        Ok(upload.clone())
    }

    /// The batch expected under `name`; only the first entry must carry a filename
    pub fn required_files(&self, name: &str) -> Result<Vec<UploadedFile>, ApiError> {
        let uploads = self.files(name);
        match uploads.first() {
            None => Err(ApiError::NoFilesUploaded),
            Some(first) if !first.has_filename() => Err(ApiError::NoFilesSelected),
            Some(_) => Ok(uploads),
        }
    }
}

/// `Content-Disposition` value offering `filename` as a download
///
/// Token-safe names go out bare, anything else is quoted; non-ASCII names get an
/// ASCII fallback plus an RFC 5987 `filename*` parameter.
pub fn content_disposition(filename: &str) -> HeaderValue {
    let value = if filename.is_ascii() {
        format!("attachment; filename={}", quote_if_needed(filename))
    } else {
        let fallback: String = filename
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        format!(
            "attachment; filename={}; filename*=UTF-8''{}",
            quote_if_needed(&fallback),
            utf8_percent_encode(filename, ATTR_CHAR)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn quote_if_needed(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_token_char) {
        return value.to_string();
    }

    let escaped: String = value
        .chars()
        .filter(|c| !c.is_ascii_control())
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            _ => vec![c],
        })
        .collect();
    format!("\"{escaped}\"")
}

/// Binary download response for a finished transformation
pub fn attachment(result: ConversionResult) -> Response {
    let content_type = HeaderValue::from_str(result.mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, content_disposition(&result.filename)),
        ],
        result.data,
    )
        .into_response()
}

//! Filename allow-lists per operation

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
pub const ALLOWED_PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Lower-cased text after the last `.`, if the name has one
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn allowed(filename: &str, allow_list: &[&str]) -> bool {
    extension(filename).is_some_and(|ext| allow_list.contains(&ext.as_str()))
}

pub fn allowed_image_file(filename: &str) -> bool {
    allowed(filename, ALLOWED_IMAGE_EXTENSIONS)
}

pub fn allowed_pdf_file(filename: &str) -> bool {
    allowed(filename, ALLOWED_PDF_EXTENSIONS)
}

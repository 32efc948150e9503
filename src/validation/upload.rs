use std::path::Path;

use crate::error::{ClientError, Result};

/// The largest scan the backend accepts.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// File extensions the backend accepts.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Validates a scan image before it is uploaded.
///
/// # Arguments
///
/// * `path` - Where the image was read from; its extension must be allowed.
/// * `bytes` - The file contents; they must look like a PNG or JPEG.
///
/// # Returns
///
/// A `Result` containing the MIME type to upload the image with.
pub fn validate_image(path: &Path, bytes: &[u8]) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ClientError::Validation(
            "File type not allowed: use PNG, JPG or JPEG".to_string(),
        ));
    }

    if bytes.is_empty() {
        return Err(ClientError::Validation("Image file is empty".to_string()));
    }

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ClientError::Validation(
            "Image must be at most 16MB".to_string(),
        ));
    }

    match infer::get(bytes).map(|kind| kind.mime_type()) {
        Some(mime @ ("image/png" | "image/jpeg")) => Ok(mime),
        _ => Err(ClientError::Validation(format!(
            "{} is not a PNG or JPEG image",
            path.display()
        ))),
    }
}

use base64::{Engine as _, engine::general_purpose};

use crate::error::{ClientError, Result};

/// The MIME type assumed when the bytes do not identify themselves.
const FALLBACK_MIME: &str = "image/jpeg";

/// Decodes a base64 image payload.
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ClientError::Validation(format!("Invalid base64 image data: {}", e)))
}

/// Encodes raw image bytes for transport.
pub fn encode(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Sniffs the image type of raw bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// Renders a base64 payload as an inline `data:` URI.
///
/// Returns `None` when the payload is empty or not valid base64.
pub fn data_uri(encoded: &str) -> Option<String> {
    if encoded.trim().is_empty() {
        return None;
    }

    let bytes = decode(encoded).ok()?;
    Some(format!("data:{};base64,{}", sniff_mime(&bytes), encoded.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_data_uri_sniffs_png() {
        let uri = data_uri(&encode(&PNG_HEADER)).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_data_uri_defaults_to_jpeg() {
        let uri = data_uri(&encode(b"not really an image")).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_data_uri_rejects_bad_payloads() {
        assert!(data_uri("").is_none());
        assert!(data_uri("***").is_none());
    }
}

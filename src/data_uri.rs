use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::RasterError;

pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Encode PNG bytes as `data:image/png;base64,...`
pub fn encode_png(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", PNG_CONTENT_TYPE, STANDARD.encode(bytes))
}

/// Decoded `data:` URI
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Split a base64 `data:` URI into its content type and payload bytes
pub fn decode(uri: &str) -> Result<DataUri, RasterError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| RasterError::InvalidImageData("missing data: scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RasterError::InvalidImageData("missing payload separator".into()))?;

    let mut params = header.split(';');
    let content_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(RasterError::InvalidImageData(
            "only base64 payloads are supported".into(),
        ));
    }
    if !content_type.starts_with("image/") {
        return Err(RasterError::InvalidImageData(format!(
            "not an image content type: {:?}",
            content_type
        )));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| RasterError::InvalidImageData(e.to_string()))?;
    if bytes.is_empty() {
        return Err(RasterError::InvalidImageData("empty payload".into()));
    }

    Ok(DataUri {
        content_type,
        bytes,
    })
}

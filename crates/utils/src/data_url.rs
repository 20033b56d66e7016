//! Helpers for `data:<mime>;base64,<payload>` image references.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;

const DEFAULT_MIME: &str = "image/png";

#[derive(Debug, Error, PartialEq)]
pub enum DataUrlError {
    #[error("empty image payload")]
    Empty,
    #[error("base64 decode failed: {0}")]
    Base64(String),
}

/// Bytes carried by a data URL together with their declared content type
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encode raw bytes as a base64 data URL.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.trim().is_empty() {
        DEFAULT_MIME
    } else {
        mime_type.trim()
    };
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Decode a data URL. A bare base64 payload without the `data:` header is
/// accepted as well and assumed to be PNG.
pub fn decode(value: &str) -> Result<DecodedDataUrl, DataUrlError> {
    let value = value.trim();
    let (mime_type, payload) = match value.split_once(',') {
        Some((meta, payload)) => {
            let mime_type = meta
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .map(str::trim)
                .filter(|mime| !mime.is_empty())
                .unwrap_or(DEFAULT_MIME);
            (mime_type, payload)
        }
        None => (DEFAULT_MIME, value),
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DataUrlError::Empty);
    }

    let bytes = BASE64
        .decode(payload.as_bytes())
        .map_err(|e| DataUrlError::Base64(e.to_string()))?;

    Ok(DecodedDataUrl {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

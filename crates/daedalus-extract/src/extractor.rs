//! Decoders over an [`Exchange`].

use daedalus_core::Exchange;
use serde::de::DeserializeOwned;

use crate::error::{ExtractionError, ExtractionSource};

/// Default maximum body size for body extraction (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Decodes the query string. A missing query decodes like an empty one.
pub fn decode_query<T: DeserializeOwned>(exchange: &Exchange) -> Result<T, ExtractionError> {
    serde_urlencoded::from_str(exchange.query().unwrap_or(""))
        .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Query, e))
}

/// Decodes a url-encoded form body no larger than `max_size` bytes.
pub fn decode_form<T: DeserializeOwned>(
    exchange: &Exchange,
    max_size: usize,
) -> Result<T, ExtractionError> {
    let body = exchange.body();
    if body.len() > max_size {
        return Err(ExtractionError::payload_too_large(max_size, body.len()));
    }
    let text = std::str::from_utf8(body).map_err(|e| {
        ExtractionError::deserialization_failed(ExtractionSource::Body, format!("invalid UTF-8: {e}"))
    })?;
    serde_urlencoded::from_str(text)
        .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Body, e))
}

/// Decodes a JSON document no larger than `max_size` bytes.
///
/// `source` tells whether the bytes came from a request body or a frame.
pub fn decode_json<T: DeserializeOwned>(
    bytes: &[u8],
    max_size: usize,
    source: ExtractionSource,
) -> Result<T, ExtractionError> {
    if bytes.len() > max_size {
        return Err(ExtractionError::payload_too_large(max_size, bytes.len()));
    }
    if bytes.is_empty() {
        return Err(ExtractionError::missing(source, "empty JSON document"));
    }
    serde_json::from_slice(bytes).map_err(|e| ExtractionError::deserialization_failed(source, e))
}

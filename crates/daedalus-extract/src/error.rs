//! Extraction error types.

use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Where the data was being extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Path parameters
    Path,
    /// Query string
    Query,
    /// Request body
    Body,
    /// A WebSocket frame
    Frame,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
            Self::Frame => "frame",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Missing,
    DeserializationFailed,
    PayloadTooLarge,
}

/// Error that occurs during extraction.
///
/// ```rust
/// use daedalus_extract::{ExtractionError, ExtractionSource};
/// use http::StatusCode;
///
/// let err = ExtractionError::payload_too_large(16, 32);
/// assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
/// assert_eq!(err.extraction_source(), ExtractionSource::Body);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtractionError {
    origin: ExtractionSource,
    kind: Kind,
    message: String,
}

impl ExtractionError {
    /// Creates an error for missing input.
    #[must_use]
    pub fn missing(source: ExtractionSource, what: impl fmt::Display) -> Self {
        Self {
            origin: source,
            kind: Kind::Missing,
            message: format!("missing {source}: {what}"),
        }
    }

    /// Creates an error for input that failed to deserialize.
    #[must_use]
    pub fn deserialization_failed(source: ExtractionSource, error: impl fmt::Display) -> Self {
        Self {
            origin: source,
            kind: Kind::DeserializationFailed,
            message: format!("failed to deserialize {source}: {error}"),
        }
    }

    /// Creates an error for a body over the size limit.
    #[must_use]
    pub fn payload_too_large(max_size: usize, actual_size: usize) -> Self {
        Self {
            origin: ExtractionSource::Body,
            kind: Kind::PayloadTooLarge,
            message: format!("payload too large: max {max_size} bytes, got {actual_size} bytes"),
        }
    }

    /// Where extraction failed.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        self.origin
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            Kind::Missing | Kind::DeserializationFailed => StatusCode::BAD_REQUEST,
            Kind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Machine-readable code for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            Kind::Missing => "MISSING_INPUT",
            Kind::DeserializationFailed => "DESERIALIZATION_FAILED",
            Kind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_error() {
        let err = ExtractionError::missing(ExtractionSource::Body, "empty request body");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "MISSING_INPUT");
        assert_eq!(err.to_string(), "missing body: empty request body");
    }

    #[test]
    fn test_deserialization_error_names_source() {
        let err = ExtractionError::deserialization_failed(ExtractionSource::Query, "bad int");
        assert_eq!(err.extraction_source(), ExtractionSource::Query);
        assert!(err.to_string().contains("query"));
    }
}

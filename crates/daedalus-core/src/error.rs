//! Error classification and business errors.
//!
//! Pipeline failures are classified by [`ErrorCategory`] and rendered as an
//! [`ErrorEnvelope`]. Business handlers return [`ApiError`], which carries a
//! registered key, a numeric code and the HTTP status to answer with.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories of errors for classification and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request input.
    Validation,
    /// Missing or invalid credentials.
    Authentication,
    /// No route for the path.
    NotFound,
    /// Route exists, verb does not.
    MethodNotAllowed,
    /// Error returned by a business handler.
    Business,
    /// Misconfiguration or failure inside the pipeline.
    Internal,
    /// Request exceeded its time budget.
    Timeout,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation | Self::Business => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Error returned by a business handler.
///
/// `key` is the registered dotted name (`CommonErr.UNKNOWN`), `code` the
/// numeric code exposed by the general wrapper, `status` the HTTP status used
/// when the error is rendered out of band.
///
/// ```
/// use daedalus_core::ApiError;
/// use http::StatusCode;
///
/// let err = ApiError::new("UserErr.NOT_FOUND", 40401, "no such user")
///     .with_status(StatusCode::NOT_FOUND);
/// assert_eq!(err.code, 40401);
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key} ({code}): {message}")]
pub struct ApiError {
    /// Registered error key.
    pub key: String,
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// HTTP status for out-of-band rendering.
    pub status: StatusCode,
}

impl ApiError {
    /// Creates an error answered with `400 Bad Request`.
    #[must_use]
    pub fn new(key: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code,
            message: message.into(),
            status: ErrorCategory::Business.default_status_code(),
        }
    }

    /// Overrides the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// `CommonErr.UNKNOWN`.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new("CommonErr.UNKNOWN", -1, "unknown error")
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// `CommonErr.TOKEN_EXPIRE`.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::new("CommonErr.TOKEN_EXPIRE", 55555, "token expired")
            .with_status(StatusCode::UNAUTHORIZED)
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorEnvelope {
    /// Builds an envelope without details.
    #[must_use]
    pub fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                category,
                details: None,
            },
            request_id: None,
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Attaches the request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl ToString) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_status_mapping() {
        assert_eq!(
            ErrorCategory::Validation.default_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCategory::Authentication.default_status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCategory::Internal.default_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_presets() {
        let unknown = ApiError::unknown();
        assert_eq!(unknown.key, "CommonErr.UNKNOWN");
        assert_eq!(unknown.code, -1);

        let expired = ApiError::token_expired();
        assert_eq!(expired.code, 55555);
        assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::new("HelloErr.EMPTY", 7, "name is empty");
        assert_eq!(err.to_string(), "HelloErr.EMPTY (7): name is empty");
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = ErrorEnvelope::new(ErrorCategory::Validation, "DECODE_ERROR", "bad json")
            .with_request_id("abc");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "DECODE_ERROR");
        assert_eq!(json["error"]["category"], "validation");
        assert_eq!(json["request_id"], "abc");
        assert!(json["error"].get("details").is_none());
    }
}

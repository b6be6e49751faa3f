//! Pipeline errors.

use daedalus_core::{ApiError, ErrorCategory, ErrorEnvelope, RequestId, Response, ResponseExt};
use daedalus_extract::ExtractionError;
use daedalus_ws::WsError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised while building a chain or driving a request through it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The spec string or a stage value cannot be turned into a chain.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A provider was registered after the registry was sealed.
    #[error("provider registry is sealed, cannot register `{0}`")]
    RegistrySealed(String),

    /// The request could not be decoded into its typed form.
    #[error("decode error: {0}")]
    Decode(#[from] ExtractionError),

    /// The authenticator rejected the request.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The business handler returned an error.
    #[error("handler error: {0}")]
    Handler(#[from] ApiError),

    /// The response could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// The WebSocket upgrade was rejected or failed.
    #[error("upgrade error: {0}")]
    Upgrade(#[from] WsError),

    /// A stage ran without the stage it depends on.
    #[error("{stage} stage missing")]
    MissingStage {
        /// The stage that should have run earlier.
        stage: &'static str,
        /// Status the request is aborted with.
        status: StatusCode,
    },
}

impl PipelineError {
    /// `handle` ran without a `req` stage before it.
    #[must_use]
    pub const fn missing_request_stage() -> Self {
        Self::MissingStage {
            stage: "request",
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// `rsp` ran without a `handle` stage before it.
    #[must_use]
    pub const fn missing_handle_stage() -> Self {
        Self::MissingStage {
            stage: "handle",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) | Self::Upgrade(_) => ErrorCategory::Validation,
            Self::MissingStage { status, .. } if status.is_client_error() => {
                ErrorCategory::Validation
            }
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Handler(_) => ErrorCategory::Business,
            Self::Configuration(_)
            | Self::RegistrySealed(_)
            | Self::Encode(_)
            | Self::MissingStage { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status the request is aborted with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(e) => e.status_code(),
            Self::Handler(e) => e.status,
            Self::MissingStage { status, .. } => *status,
            _ => self.category().default_status_code(),
        }
    }

    /// Machine-readable code for the error envelope.
    #[must_use]
    pub fn error_code(&self) -> String {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR".to_string(),
            Self::RegistrySealed(_) => "REGISTRY_SEALED".to_string(),
            Self::Decode(e) => e.error_code().to_string(),
            Self::Auth(_) => "AUTHENTICATION_ERROR".to_string(),
            Self::Handler(e) => e.key.clone(),
            Self::Encode(_) => "ENCODE_ERROR".to_string(),
            Self::Upgrade(_) => "UPGRADE_ERROR".to_string(),
            Self::MissingStage { .. } => "MISSING_STAGE".to_string(),
        }
    }

    /// Builds the error envelope for this error.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<RequestId>) -> ErrorEnvelope {
        let mut envelope = ErrorEnvelope::new(self.category(), self.error_code(), self.to_string());
        if let Self::Handler(e) = self {
            envelope = envelope.with_details(serde_json::json!({ "code": e.code }));
        }
        match request_id {
            Some(id) => envelope.with_request_id(id),
            None => envelope,
        }
    }

    /// Renders the error as an HTTP response.
    #[must_use]
    pub fn into_response(self, request_id: RequestId) -> Response {
        Response::envelope(self.status_code(), &self.to_envelope(Some(request_id)))
    }
}

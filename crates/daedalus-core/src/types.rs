//! Response plumbing shared by the pipeline and the server.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use std::future::Future;
use std::pin::Pin;

use crate::error::ErrorEnvelope;

/// The HTTP response type produced by pipelines.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Builders for common response shapes.
pub trait ResponseExt {
    /// `application/json` response with the given body.
    fn json(status: StatusCode, body: &serde_json::Value) -> Response;

    /// Response with a raw body and content type.
    fn with_body(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response;

    /// JSON error envelope response.
    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response;

    /// Empty response.
    fn empty(status: StatusCode) -> Response;
}

impl ResponseExt for Response {
    fn json(status: StatusCode, body: &serde_json::Value) -> Response {
        Self::with_body(status, "application/json", body.to_string())
    }

    fn with_body(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, content_type)
            .body(Full::new(body.into()))
            .expect("failed to build response")
    }

    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response {
        let body = serde_json::to_value(envelope).unwrap_or_default();
        Self::json(status, &body)
    }

    fn empty(status: StatusCode) -> Response {
        http::Response::builder()
            .status(status)
            .body(Full::new(Bytes::new()))
            .expect("failed to build empty response")
    }
}

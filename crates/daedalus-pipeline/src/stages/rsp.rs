//! The `rsp` stage: encodes the handler result.
//!
//! The token value is `media@wrapper`:
//!
//! | value | success body | error body |
//! |---|---|---|
//! | `json` (default) | the value | `{"error": key, "detail": message}`, error status |
//! | `json@general` | `{"code":0,"message":"","data":value}` | `{"code":code,"message":message}`, 200 |
//! | `html`, `text` | the value, which must serialize to a string | as `json` |

use daedalus_core::{ApiError, Response, ResponseExt};
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::context::Context;
use crate::error::{PipelineError, PipelineResult};
use crate::provider::Outcome;

/// Body media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Media {
    /// `application/json`
    Json,
    /// `text/html`
    Html,
    /// `text/plain`
    Text,
}

impl Media {
    fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

/// Envelope around the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    /// Bare value; errors answered with their HTTP status.
    None,
    /// `{code, message, data}` envelope; errors carried in-band with 200.
    General,
}

/// Encodes the `handle` slot into the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RspProvider {
    media: Media,
    wrapper: Wrapper,
}

impl Default for RspProvider {
    fn default() -> Self {
        Self {
            media: Media::Json,
            wrapper: Wrapper::None,
        }
    }
}

impl RspProvider {
    /// Parses a token value.
    ///
    /// ```
    /// use daedalus_pipeline::stages::{Media, RspProvider, Wrapper};
    ///
    /// let rsp = RspProvider::parse("json@general").unwrap();
    /// assert_eq!((rsp.media(), rsp.wrapper()), (Media::Json, Wrapper::General));
    /// assert!(RspProvider::parse("yaml").is_err());
    /// ```
    pub fn parse(value: &str) -> PipelineResult<Self> {
        let (media, wrapper) = value.split_once('@').unwrap_or((value, ""));
        let media = match media.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Media::Json,
            "html" => Media::Html,
            "text" => Media::Text,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "rsp: unknown media `{other}` (expected json, html or text)"
                )))
            }
        };
        let wrapper = match wrapper.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Wrapper::None,
            "general" => Wrapper::General,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "rsp: unknown wrapper `{other}` (expected none or general)"
                )))
            }
        };
        if wrapper == Wrapper::General && media != Media::Json {
            return Err(PipelineError::Configuration(
                "rsp: the general wrapper requires json media".to_string(),
            ));
        }
        Ok(Self { media, wrapper })
    }

    /// The body media type.
    pub const fn media(&self) -> Media {
        self.media
    }

    /// The envelope.
    pub const fn wrapper(&self) -> Wrapper {
        self.wrapper
    }

    /// Encodes a handler result into a status, content type and body.
    pub fn encode<P: Serialize>(
        &self,
        result: &Result<P, ApiError>,
    ) -> PipelineResult<(StatusCode, &'static str, String)> {
        match (result, self.wrapper) {
            (Ok(value), Wrapper::None) => {
                let value = to_value(value)?;
                match (self.media, value) {
                    (Media::Json, value) => {
                        Ok((StatusCode::OK, self.media.content_type(), value.to_string()))
                    }
                    (_, Value::String(body)) => Ok((StatusCode::OK, self.media.content_type(), body)),
                    (media, _) => Err(PipelineError::Encode(format!(
                        "{media:?} response must serialize to a string"
                    ))),
                }
            }
            (Ok(value), Wrapper::General) => {
                let body = json!({ "code": 0, "message": "", "data": to_value(value)? });
                Ok((StatusCode::OK, Media::Json.content_type(), body.to_string()))
            }
            (Err(err), Wrapper::None) => {
                let body = json!({ "error": err.key, "detail": err.message });
                Ok((err.status, Media::Json.content_type(), body.to_string()))
            }
            (Err(err), Wrapper::General) => {
                let body = json!({ "code": err.code, "message": err.message });
                Ok((StatusCode::OK, Media::Json.content_type(), body.to_string()))
            }
        }
    }

    /// Encodes a handler result into an HTTP response.
    pub fn render<P: Serialize>(&self, result: &Result<P, ApiError>) -> PipelineResult<Response> {
        let (status, content_type, body) = self.encode(result)?;
        Ok(Response::with_body(status, content_type, body))
    }

    /// Encodes a handler result into a WebSocket text frame.
    pub fn encode_frame<P: Serialize>(&self, result: &Result<P, ApiError>) -> PipelineResult<String> {
        self.encode(result).map(|(_, _, body)| body)
    }

    pub(crate) fn run<Q, F, J, P: Serialize>(&self, ctx: &mut Context<Q, F, J, P>) -> Outcome {
        if ctx.ws().is_some() {
            return Outcome::Continue;
        }
        let rendered = match ctx.handle_result() {
            None => return Outcome::Abort(PipelineError::missing_handle_stage()),
            Some(result) => self.render(result),
        };
        match rendered {
            Ok(response) => {
                ctx.exchange_mut().set_response(response);
                Outcome::Continue
            }
            Err(err) => {
                error!(request_id = %ctx.request_id(), error = %err, "response encoding failed");
                Outcome::Abort(err)
            }
        }
    }
}

/// Renders a handler error without an encoder: bare-wrapper shape and status.
pub(crate) fn render_unencoded_error(err: &ApiError) -> Response {
    Response::json(
        err.status,
        &json!({ "error": err.key, "detail": err.message }),
    )
}

fn to_value<P: Serialize>(value: &P) -> PipelineResult<Value> {
    serde_json::to_value(value).map_err(|e| PipelineError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use daedalus_core::Exchange;
    use http::Method;
    use http_body_util::BodyExt;
    use serde::ser::Error as _;
    use std::sync::Arc;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    fn context<P>() -> Context<(), (), (), P> {
        Context::new(
            Exchange::new(Method::GET, "/".parse().unwrap()),
            Arc::new(Indexer::default()),
        )
    }

    async fn body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(RspProvider::parse("").unwrap().media(), Media::Json);
        assert_eq!(RspProvider::parse("TEXT").unwrap().media(), Media::Text);
        assert_eq!(RspProvider::parse("json@none").unwrap().wrapper(), Wrapper::None);
        assert!(RspProvider::parse("json@envelope").is_err());
        assert!(RspProvider::parse("html@general").is_err());
    }

    #[tokio::test]
    async fn test_general_wrapper_success() {
        let rsp = RspProvider::parse("json@general").unwrap();
        let response = rsp.render(&Ok::<_, ApiError>(json!({"n": 1}))).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, json!({"code": 0, "message": "", "data": {"n": 1}}));
    }

    #[tokio::test]
    async fn test_general_wrapper_error_is_in_band() {
        let rsp = RspProvider::parse("json@general").unwrap();
        let response = rsp.render(&Err::<Value, _>(ApiError::token_expired())).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body(response).await;
        assert_eq!(value["code"], 55555);
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_bare_error_uses_status() {
        let rsp = RspProvider::parse("json").unwrap();
        let response = rsp.render(&Err::<Value, _>(ApiError::token_expired())).unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(response).await["error"], "CommonErr.TOKEN_EXPIRE");
    }

    #[test]
    fn test_text_requires_string() {
        let rsp = RspProvider::parse("text").unwrap();
        let (status, content_type, body) = rsp.encode(&Ok::<_, ApiError>("hi")).unwrap();
        assert_eq!((status, body.as_str()), (StatusCode::OK, "hi"));
        assert!(content_type.starts_with("text/plain"));

        let err = rsp.encode(&Ok::<_, ApiError>(42)).unwrap_err();
        assert!(matches!(err, PipelineError::Encode(_)));
    }

    #[test]
    fn test_run_without_handle_slot_aborts_500() {
        let mut ctx = context::<String>();
        match RspProvider::parse("json").unwrap().run(&mut ctx) {
            Outcome::Abort(err) => {
                assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(err.to_string(), "handle stage missing");
            }
            Outcome::Continue => panic!("encoded without a handler result"),
        }
    }

    #[test]
    fn test_run_serialization_failure() {
        let mut ctx = context::<Unserializable>();
        ctx.set_handle_result(Ok(Unserializable));
        let outcome = RspProvider::parse("json").unwrap().run(&mut ctx);
        assert!(matches!(outcome, Outcome::Abort(PipelineError::Encode(_))));
        assert!(ctx.exchange().response().is_none());
    }

    #[test]
    fn test_run_writes_response() {
        let mut ctx = context::<String>();
        ctx.set_handle_result(Ok("done".to_string()));
        assert!(RspProvider::parse("json").unwrap().run(&mut ctx).is_continue());
        assert_eq!(ctx.exchange().response().unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn test_frame_body() {
        let rsp = RspProvider::parse("json@general").unwrap();
        let frame = rsp.encode_frame(&Ok::<_, ApiError>(1)).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&frame).unwrap()["data"], 1);
    }
}

//! The `auth` stage.
//!
//! Three schemes ship with the pipeline:
//!
//! - **jwt**: `Authorization: Bearer <header>.<claims>.<signature>`. The
//!   claims segment must be base64url JSON; `exp` is checked against the
//!   current time and `sub` becomes the subject. Signatures are not verified,
//!   so this scheme is for development only.
//! - **bearer**: any non-empty bearer token, kept opaque.
//! - **api_key**: the `X-API-Key` header.
//!
//! Other schemes are installed on the registry as `auth.<scheme>`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use daedalus_core::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::AuthResult;
use crate::error::PipelineError;
use crate::provider::{names, Outcome, Provider, ProviderContext};

/// Header carrying API keys.
pub const API_KEY_HEADER: &str = "x-api-key";

const BEARER_PREFIX: &str = "Bearer ";

/// Built-in authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Structured bearer token with JSON claims.
    ///
    /// **Not for production.** The signature segment is never checked, so any
    /// client can mint a token with arbitrary claims. Register a verifying
    /// provider as `auth.<scheme>` instead.
    Jwt,
    /// Opaque bearer token.
    Bearer,
    /// `X-API-Key` header.
    ApiKey,
}

impl AuthScheme {
    /// Looks up a built-in scheme by its token value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jwt" => Some(Self::Jwt),
            "bearer" => Some(Self::Bearer),
            "api_key" | "apikey" => Some(Self::ApiKey),
            _ => None,
        }
    }

    /// The scheme's token value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Jwt => "jwt",
            Self::Bearer => "bearer",
            Self::ApiKey => "api_key",
        }
    }
}

/// Authenticator for the built-in schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthProvider {
    scheme: AuthScheme,
}

impl AuthProvider {
    /// Creates an authenticator for `scheme`.
    pub const fn new(scheme: AuthScheme) -> Self {
        Self { scheme }
    }

    /// The scheme this authenticator accepts.
    pub const fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Checks the request's credentials.
    pub fn authenticate(&self, ctx: &dyn ProviderContext) -> Result<AuthResult, String> {
        let exchange = ctx.exchange();
        match self.scheme {
            AuthScheme::Jwt => {
                let token = bearer_token(exchange.header("authorization"))?;
                let claims = decode_claims(token)?;
                check_expiry(&claims)?;
                let subject = claims.get("sub").and_then(Value::as_str).map(str::to_owned);
                Ok(AuthResult {
                    scheme: self.scheme.as_str().to_string(),
                    subject,
                    claims,
                })
            }
            AuthScheme::Bearer => {
                bearer_token(exchange.header("authorization"))?;
                Ok(AuthResult {
                    scheme: self.scheme.as_str().to_string(),
                    subject: None,
                    claims: Value::Null,
                })
            }
            AuthScheme::ApiKey => {
                let key = exchange
                    .header(API_KEY_HEADER)
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| "missing API key".to_string())?;
                Ok(AuthResult {
                    scheme: self.scheme.as_str().to_string(),
                    subject: Some(key.to_string()),
                    claims: Value::Null,
                })
            }
        }
    }
}

fn bearer_token(header: Option<&str>) -> Result<&str, String> {
    let header = header.ok_or_else(|| "missing authorization header".to_string())?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| "authorization header is not a bearer token".to_string())?
        .trim();
    if token.is_empty() {
        return Err("empty bearer token".to_string());
    }
    Ok(token)
}

fn decode_claims(token: &str) -> Result<Value, String> {
    let mut segments = token.split('.');
    let (Some(_header), Some(claims), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err("malformed token".to_string());
    };
    let raw = URL_SAFE_NO_PAD
        .decode(claims.trim_end_matches('='))
        .map_err(|e| format!("malformed token claims: {e}"))?;
    let claims: Value =
        serde_json::from_slice(&raw).map_err(|e| format!("malformed token claims: {e}"))?;
    if !claims.is_object() {
        return Err("token claims are not an object".to_string());
    }
    Ok(claims)
}

fn check_expiry(claims: &Value) -> Result<(), String> {
    match claims.get("exp") {
        None => Ok(()),
        Some(exp) => {
            let exp = exp
                .as_i64()
                .ok_or_else(|| "token `exp` is not a timestamp".to_string())?;
            if exp <= Utc::now().timestamp() {
                Err("token expired".to_string())
            } else {
                Ok(())
            }
        }
    }
}

impl Provider for AuthProvider {
    fn name(&self) -> &str {
        names::AUTH
    }

    fn handle<'a>(&'a self, ctx: &'a mut dyn ProviderContext) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            match self.authenticate(ctx) {
                Ok(auth) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        scheme = %auth.scheme,
                        subject = ?auth.subject,
                        "request authenticated"
                    );
                    ctx.set_auth(auth);
                    Outcome::Continue
                }
                Err(reason) => {
                    warn!(
                        request_id = %ctx.request_id(),
                        scheme = self.scheme.as_str(),
                        reason = %reason,
                        "authentication failed"
                    );
                    Outcome::Abort(PipelineError::Auth(reason))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::indexer::Indexer;
    use daedalus_core::Exchange;
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn token(claims: &Value) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    fn context(headers: &[(&str, &str)]) -> Context<(), (), (), ()> {
        let mut exchange = Exchange::new(Method::GET, "/".parse().unwrap());
        for (name, value) in headers {
            exchange = exchange.with_header(name, value);
        }
        Context::new(exchange, Arc::new(Indexer::default()))
    }

    async fn run(scheme: AuthScheme, headers: &[(&str, &str)]) -> (Outcome, Context<(), (), (), ()>) {
        let mut ctx = context(headers);
        let outcome = AuthProvider::new(scheme).handle(&mut ctx).await;
        (outcome, ctx)
    }

    #[test]
    fn test_scheme_parse() {
        assert_eq!(AuthScheme::parse("JWT"), Some(AuthScheme::Jwt));
        assert_eq!(AuthScheme::parse("api_key"), Some(AuthScheme::ApiKey));
        assert_eq!(AuthScheme::parse("oauth"), None);
    }

    #[tokio::test]
    async fn test_jwt_sets_subject() {
        let exp = Utc::now().timestamp() + 600;
        let bearer = format!("Bearer {}", token(&json!({"sub": "u-1", "exp": exp})));
        let (outcome, ctx) = run(AuthScheme::Jwt, &[("authorization", bearer.as_str())]).await;
        assert!(outcome.is_continue());
        let auth = ctx.auth().unwrap();
        assert_eq!(auth.subject.as_deref(), Some("u-1"));
        assert_eq!(auth.claims["exp"], exp);
    }

    // Documents the development-only contract: any signature is accepted.
    #[tokio::test]
    async fn test_jwt_signature_is_not_checked() {
        let claims = URL_SAFE_NO_PAD.encode(json!({"sub": "admin"}).to_string());
        let forged = format!("Bearer e30.{claims}.not-a-signature");
        let (outcome, ctx) = run(AuthScheme::Jwt, &[("authorization", forged.as_str())]).await;
        assert!(outcome.is_continue());
        assert_eq!(ctx.auth().unwrap().subject.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_jwt_expired_aborts() {
        let bearer = format!("Bearer {}", token(&json!({"sub": "u-1", "exp": 1})));
        let (outcome, ctx) = run(AuthScheme::Jwt, &[("authorization", bearer.as_str())]).await;
        match outcome {
            Outcome::Abort(err) => {
                assert_eq!(err.status_code(), http::StatusCode::UNAUTHORIZED);
                assert!(err.to_string().contains("expired"));
            }
            Outcome::Continue => panic!("expired token accepted"),
        }
        assert!(ctx.auth().is_none());
    }

    #[tokio::test]
    async fn test_jwt_malformed_aborts() {
        let (outcome, _) = run(AuthScheme::Jwt, &[("authorization", "Bearer abc")]).await;
        assert!(!outcome.is_continue());
    }

    #[tokio::test]
    async fn test_missing_header_aborts() {
        let (outcome, _) = run(AuthScheme::Bearer, &[]).await;
        assert!(matches!(outcome, Outcome::Abort(PipelineError::Auth(_))));
    }

    #[tokio::test]
    async fn test_bearer_is_opaque() {
        let (outcome, ctx) = run(AuthScheme::Bearer, &[("authorization", "Bearer opaque")]).await;
        assert!(outcome.is_continue());
        assert_eq!(ctx.auth().unwrap().claims, Value::Null);
    }

    #[tokio::test]
    async fn test_api_key_subject() {
        let (outcome, ctx) = run(AuthScheme::ApiKey, &[("x-api-key", "k-42")]).await;
        assert!(outcome.is_continue());
        assert_eq!(ctx.auth().unwrap().subject.as_deref(), Some("k-42"));
    }
}

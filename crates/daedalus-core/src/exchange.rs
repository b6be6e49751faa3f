//! The per-request transport handle.

use bytes::Bytes;
use daedalus_router::Params;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use std::any::Any;
use std::collections::HashMap;

use crate::request_id::RequestId;
use crate::types::Response;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything a pipeline sees of one inbound request, plus the response
/// slot it writes into.
///
/// The body is fully buffered before the pipeline runs. Stages may stash
/// opaque values under string keys for later stages.
///
/// ```
/// use daedalus_core::Exchange;
/// use http::Method;
///
/// let mut exchange = Exchange::new(Method::GET, "/hello?name=ada".parse().unwrap());
/// exchange.insert_state("tenant", 7_u32);
/// assert_eq!(exchange.query(), Some("name=ada"));
/// assert_eq!(exchange.state::<u32>("tenant"), Some(&7));
/// ```
pub struct Exchange {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
    request_id: RequestId,
    state: HashMap<String, Box<dyn Any + Send + Sync>>,
    response: Option<Response>,
}

impl Exchange {
    /// Creates an exchange with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::new(),
            request_id: RequestId::new(),
            state: HashMap::new(),
            response: None,
        }
    }

    /// Creates an exchange from request parts and a buffered body.
    ///
    /// A well-formed `X-Request-Id` header is adopted as the request id.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: Params::new(),
            request_id,
            state: HashMap::new(),
            response: None,
        }
    }

    /// Adds a header.
    ///
    /// Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the buffered body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// The request verb.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, without `?`.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Path parameters captured by the router.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces the path parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// The id of this request.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Stores an opaque value under `key`, replacing any previous one.
    pub fn insert_state<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.state.insert(key.into(), Box::new(value));
    }

    /// Borrows the value under `key` if it has type `T`.
    #[must_use]
    pub fn state<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.state.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove_state<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        if !self.state.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.state
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Writes the response, replacing any earlier one.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// The response written so far.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Takes the written response out of the exchange.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("body_len", &self.body.len())
            .field("state_keys", &self.state.keys().collect::<Vec<_>>())
            .field("has_response", &self.response.is_some())
            .finish_non_exhaustive()
    }
}

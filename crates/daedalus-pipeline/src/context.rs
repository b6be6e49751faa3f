//! The per-request context threaded through a chain.

use daedalus_core::{ApiError, Exchange, Params, RequestId};
use daedalus_extract::ExtractionError;
use serde_json::Value;
use std::sync::Arc;

use crate::indexer::Indexer;

/// The typed request handed to business handlers.
///
/// Each source is `Some` only when the `req` stage was configured to decode it.
#[derive(Debug, Clone, PartialEq)]
pub struct Req<Q, F, J> {
    /// Decoded query string.
    pub query: Option<Q>,
    /// Decoded url-encoded form body.
    pub form: Option<F>,
    /// Decoded JSON body or frame.
    pub json: Option<J>,
    /// Path parameters.
    pub params: Params,
}

impl<Q, F, J> Req<Q, F, J> {
    /// A request with no decoded sources.
    #[must_use]
    pub fn empty(params: Params) -> Self {
        Self {
            query: None,
            form: None,
            json: None,
            params,
        }
    }
}

/// What the `req` stage wrote: the request, or why it could not be decoded.
#[derive(Debug)]
pub struct ReqSlot<Q, F, J> {
    /// Decoded request, taken by the `handle` stage.
    pub request: Option<Req<Q, F, J>>,
    /// Decode failure.
    pub error: Option<ExtractionError>,
}

impl<Q, F, J> ReqSlot<Q, F, J> {
    /// A successfully decoded request.
    pub fn decoded(request: Req<Q, F, J>) -> Self {
        Self {
            request: Some(request),
            error: None,
        }
    }

    /// A decode failure.
    pub fn failed(error: ExtractionError) -> Self {
        Self {
            request: None,
            error: Some(error),
        }
    }
}

/// What an authenticator established about the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult {
    /// Scheme that accepted the credentials (`jwt`, `bearer`, `api_key`, ...).
    pub scheme: String,
    /// Authenticated subject, if the credentials name one.
    pub subject: Option<String>,
    /// Token claims, or `Value::Null` for opaque credentials.
    pub claims: Value,
}

/// State of a WebSocket route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsResult {
    /// The upgrade response was written.
    pub accepted: bool,
    /// Negotiated subprotocol.
    pub protocol: Option<String>,
    /// Data frames received.
    pub received: u64,
    /// Frames sent.
    pub sent: u64,
    /// Close code and reason sent by the peer.
    pub close: Option<(u16, String)>,
    /// Error that ended the session.
    pub error: Option<String>,
}

/// Per-request slot storage shared by every stage of one chain run.
///
/// Created once per request by the chain driver and passed by `&mut`
/// to each stage. For WebSocket routes it moves into the session and lives
/// until the socket closes.
pub struct Context<Q, F, J, P> {
    exchange: Exchange,
    indexer: Arc<Indexer>,
    req: Option<ReqSlot<Q, F, J>>,
    auth: Option<AuthResult>,
    handle: Option<Result<P, ApiError>>,
    ws: Option<WsResult>,
}

impl<Q, F, J, P> Context<Q, F, J, P> {
    /// Creates an empty context for one request.
    pub fn new(exchange: Exchange, indexer: Arc<Indexer>) -> Self {
        Self {
            exchange,
            indexer,
            req: None,
            auth: None,
            handle: None,
            ws: None,
        }
    }

    /// The transport handle.
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// The transport handle, mutably.
    pub fn exchange_mut(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    /// Gives the transport handle back.
    pub fn into_exchange(self) -> Exchange {
        self.exchange
    }

    /// Id of the request this context belongs to.
    pub fn request_id(&self) -> RequestId {
        self.exchange.request_id()
    }

    /// The chain's indexer.
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// The `req` slot, if a decoder ran.
    pub fn req_slot(&self) -> Option<&ReqSlot<Q, F, J>> {
        self.req.as_ref()
    }

    /// The `req` slot, mutably.
    pub fn req_slot_mut(&mut self) -> Option<&mut ReqSlot<Q, F, J>> {
        self.req.as_mut()
    }

    /// Writes the `req` slot.
    pub fn set_req_slot(&mut self, slot: ReqSlot<Q, F, J>) {
        self.req = Some(slot);
    }

    /// The `auth` slot.
    pub fn auth(&self) -> Option<&AuthResult> {
        self.auth.as_ref()
    }

    /// Writes the `auth` slot.
    pub fn set_auth(&mut self, auth: AuthResult) {
        self.auth = Some(auth);
    }

    /// The `handle` slot.
    pub fn handle_result(&self) -> Option<&Result<P, ApiError>> {
        self.handle.as_ref()
    }

    /// Writes the `handle` slot.
    pub fn set_handle_result(&mut self, result: Result<P, ApiError>) {
        self.handle = Some(result);
    }

    /// The `ws` slot.
    pub fn ws(&self) -> Option<&WsResult> {
        self.ws.as_ref()
    }

    /// The `ws` slot, created on first use.
    pub fn ws_mut(&mut self) -> &mut WsResult {
        self.ws.get_or_insert_with(WsResult::default)
    }
}

impl<Q, F, J, P> std::fmt::Debug for Context<Q, F, J, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id())
            .field("req", &self.req.as_ref().map(|s| s.error.is_none()))
            .field("auth", &self.auth)
            .field("handle", &self.handle.as_ref().map(Result::is_ok))
            .field("ws", &self.ws)
            .finish_non_exhaustive()
    }
}

//! The `ws_handle` stage: WebSocket upgrade and per-frame handling.
//!
//! During the HTTP request the stage only validates the upgrade and writes
//! the `101` response. The frame loop runs later, in the [`WsSession`] the
//! chain hands to the server together with the request's context.

use bytes::Bytes;
use daedalus_core::BoxFuture;
use daedalus_extract::{decode_json, ExtractionError, ExtractionSource, DEFAULT_MAX_BODY_SIZE};
use daedalus_ws::handshake::{negotiate_protocol, switching_protocols, validate_upgrade};
use daedalus_ws::{BoxedIo, Incoming, WebSocket};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, warn};

use crate::context::{Context, Req};
use crate::error::PipelineError;
use crate::provider::Outcome;
use crate::types::{HandlerFn, Payload, ReplyPayload};

/// Runs the frame loop over an upgraded connection.
pub type WsSession = Box<dyn FnOnce(WebSocket<BoxedIo>) -> BoxFuture<'static, ()> + Send>;

/// Accepts the upgrade and answers each inbound frame with the handler.
///
/// The token value lists the subprotocols the route speaks
/// (`ws_handle=chat.v2,chat.v1`).
pub struct WsHandleProvider<Q, F, J, P> {
    handler: HandlerFn<Q, F, J, P>,
    protocols: Vec<String>,
}

impl<Q, F, J, P> Clone for WsHandleProvider<Q, F, J, P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            protocols: self.protocols.clone(),
        }
    }
}

impl<Q, F, J, P> WsHandleProvider<Q, F, J, P> {
    /// Subprotocols offered to clients.
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }
}

impl<Q, F, J, P> WsHandleProvider<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    /// Creates the stage from its token value.
    pub fn new(value: &str, handler: HandlerFn<Q, F, J, P>) -> Self {
        let protocols = value
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        Self { handler, protocols }
    }

    pub(crate) fn run(&self, ctx: &mut Context<Q, F, J, P>) -> Outcome {
        let headers = ctx.exchange().headers();
        let accept = match validate_upgrade(headers) {
            Ok(accept) => accept,
            Err(err) => {
                warn!(request_id = %ctx.request_id(), error = %err, "websocket upgrade rejected");
                return Outcome::Abort(PipelineError::Upgrade(err));
            }
        };
        let protocol = negotiate_protocol(headers, &self.protocols);
        let response = switching_protocols(&accept, protocol.as_deref());
        ctx.exchange_mut().set_response(response);

        let ws = ctx.ws_mut();
        ws.accepted = true;
        ws.protocol = protocol;
        Outcome::Continue
    }

    /// Packages the frame loop for the upgraded connection.
    ///
    /// The context moves into the session and is dropped when it ends.
    pub fn session(&self, ctx: Context<Q, F, J, P>) -> WsSession {
        let provider = self.clone();
        Box::new(move |socket: WebSocket<BoxedIo>| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                let mut ctx = ctx;
                let mut socket = socket;
                provider.run_session(&mut ctx, &mut socket).await;
            })
        })
    }

    /// Reads frames until the peer closes, answering each one.
    ///
    /// Frames are decoded with the chain's `req` stage (plain JSON without
    /// one) and replies encoded with its `rsp` stage (plain JSON without
    /// one). A frame that fails to decode is answered with an error frame and
    /// the loop goes on.
    pub async fn run_session<S>(&self, ctx: &mut Context<Q, F, J, P>, socket: &mut WebSocket<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request_id = ctx.request_id();
        debug!(%request_id, protocol = ?ctx.ws().and_then(|ws| ws.protocol.clone()), "websocket session started");

        while let Some(incoming) = socket.recv().await {
            let frame = match incoming {
                Ok(Incoming::Text(text)) => Bytes::from(text),
                Ok(Incoming::Binary(data)) => data,
                Ok(Incoming::Close(reason)) => {
                    ctx.ws_mut().close = reason;
                    break;
                }
                Err(err) => {
                    warn!(%request_id, error = %err, "websocket receive failed");
                    ctx.ws_mut().error = Some(err.to_string());
                    break;
                }
            };
            ctx.ws_mut().received = socket.received();

            let reply = match self.decode_frame(ctx, &frame) {
                Err(err) => {
                    debug!(%request_id, error = %err, "websocket frame decode failed");
                    json!({ "error": err.error_code(), "detail": err.to_string() }).to_string()
                }
                Ok(req) => {
                    let result = (self.handler)(ctx, req).await;
                    let encoder = ctx.indexer().rsp().copied().unwrap_or_default();
                    let encoded = encoder.encode_frame(&result);
                    ctx.set_handle_result(result);
                    match encoded {
                        Ok(text) => text,
                        Err(err) => {
                            error!(%request_id, error = %err, "websocket reply encoding failed");
                            ctx.ws_mut().error = Some(err.to_string());
                            break;
                        }
                    }
                }
            };

            if let Err(err) = socket.send_text(reply).await {
                warn!(%request_id, error = %err, "websocket send failed");
                ctx.ws_mut().error = Some(err.to_string());
                break;
            }
            ctx.ws_mut().sent = socket.sent();
        }

        if let Err(err) = socket.close("").await {
            debug!(%request_id, error = %err, "websocket close failed");
        }
        let ws = ctx.ws_mut();
        ws.received = socket.received();
        ws.sent = socket.sent();
        debug!(%request_id, received = ws.received, sent = ws.sent, "websocket session ended");
    }

    fn decode_frame(
        &self,
        ctx: &Context<Q, F, J, P>,
        frame: &[u8],
    ) -> Result<Req<Q, F, J>, ExtractionError> {
        match ctx.indexer().req() {
            Some(req) => req.decode_frame(ctx.exchange(), frame),
            None => {
                let json = decode_json(frame, DEFAULT_MAX_BODY_SIZE, ExtractionSource::Frame)?;
                let mut req = Req::empty(ctx.exchange().params().clone());
                req.json = Some(json);
                Ok(req)
            }
        }
    }
}

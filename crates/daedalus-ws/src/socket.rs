//! Server-side WebSocket over an upgraded stream.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, trace};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Role};
use tungstenite::Message;

use crate::error::{WsError, WsResult};

/// Byte streams a WebSocket can run over.
pub trait AsyncIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncIo for T {}

/// A type-erased upgraded connection.
pub type BoxedIo = Box<dyn AsyncIo>;

/// A data-carrying frame, or the end of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
    /// Close frame from the peer, with its code and reason.
    Close(Option<(u16, String)>),
}

/// A WebSocket connection in the server role.
///
/// Ping/pong frames are answered by tungstenite and never surface from
/// [`recv`](Self::recv).
pub struct WebSocket<S = BoxedIo> {
    stream: WebSocketStream<S>,
    received: u64,
    sent: u64,
    closed: bool,
}

impl<S> WebSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream whose HTTP handshake has already completed.
    pub async fn from_raw(stream: S) -> Self {
        let stream = WebSocketStream::from_raw_socket(stream, Role::Server, None).await;
        Self {
            stream,
            received: 0,
            sent: 0,
            closed: false,
        }
    }

    /// Waits for the next data or close frame.
    ///
    /// Returns `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<WsResult<Incoming>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.closed = true;
                    return None;
                }
                Err(e) => return Some(Err(WsError::ReceiveFailed(e.to_string()))),
            };
            let incoming = match message {
                Message::Text(text) => Incoming::Text(text.as_str().to_owned()),
                Message::Binary(data) => Incoming::Binary(data),
                Message::Close(frame) => {
                    self.closed = true;
                    Incoming::Close(
                        frame.map(|f| (u16::from(f.code), f.reason.as_str().to_owned())),
                    )
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("control frame");
                    continue;
                }
            };
            if !matches!(incoming, Incoming::Close(_)) {
                self.received += 1;
            }
            return Some(Ok(incoming));
        }
    }

    /// Sends a text frame.
    pub async fn send_text(&mut self, text: impl Into<String>) -> WsResult<()> {
        self.stream
            .send(Message::text(text.into()))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))?;
        self.sent += 1;
        Ok(())
    }

    /// Sends a normal close frame and flushes it.
    ///
    /// Closing an already closed socket is a no-op.
    pub async fn close(&mut self, reason: &str) -> WsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_owned().into(),
        };
        match self.stream.close(Some(frame)).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => {
                debug!(error = %e, "close handshake failed");
                Err(WsError::from(e))
            }
        }
    }

    /// Data frames received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Frames sent so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// True after a close frame was seen or sent.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

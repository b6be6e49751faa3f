//! WebSocket error types.

use thiserror::Error;

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors raised while upgrading or driving a WebSocket.
#[derive(Debug, Error)]
pub enum WsError {
    /// The request is not a valid WebSocket upgrade.
    #[error("not a WebSocket upgrade request: {reason}")]
    NotWebSocketRequest {
        /// What was missing or wrong.
        reason: String,
    },

    /// The hyper upgrade future failed.
    #[error("WebSocket upgrade failed: {0}")]
    UpgradeFailed(String),

    /// A frame could not be sent.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Reading from the socket failed.
    #[error("failed to receive message: {0}")]
    ReceiveFailed(String),

    /// Tungstenite protocol error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WsError {
    /// Creates a "not a WebSocket request" error.
    pub fn not_websocket(reason: impl Into<String>) -> Self {
        Self::NotWebSocketRequest {
            reason: reason.into(),
        }
    }

    /// True when the error came from the handshake, not from a live socket.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::NotWebSocketRequest { .. })
    }
}

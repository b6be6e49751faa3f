//! Server error types.

use std::io;
use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// Binding the listener failed.
    #[error("failed to bind to {addr}: {origin}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// Underlying error.
        #[source]
        origin: io::Error,
    },

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

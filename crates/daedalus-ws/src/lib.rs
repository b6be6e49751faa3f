//! WebSocket plumbing for Daedalus.
//!
//! - [`handshake`]: RFC 6455 upgrade validation, accept key, subprotocol
//!   negotiation and the `101 Switching Protocols` response
//! - [`WebSocket`]: a server-side socket over any upgraded byte stream
//!
//! The HTTP upgrade itself (taking the connection away from hyper) happens
//! in the server; this crate only sees the resulting IO object.
//!
//! ```
//! use daedalus_ws::handshake::{compute_accept_key, is_websocket_request};
//! use http::HeaderMap;
//!
//! assert!(!is_websocket_request(&HeaderMap::new()));
//! assert_eq!(
//!     compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
//!     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
//! );
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-ws/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod handshake;
mod socket;

pub use error::{WsError, WsResult};
pub use socket::{AsyncIo, BoxedIo, Incoming, WebSocket};

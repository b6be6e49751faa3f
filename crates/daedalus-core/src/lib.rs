//! # Daedalus Core
//!
//! Types shared by every Daedalus crate:
//!
//! - [`Exchange`] - the transport handle a pipeline works on for one request
//! - [`RequestId`] - UUID v7 request identifier
//! - [`ApiError`] - business error returned by handlers
//! - [`ErrorCategory`] / [`ErrorEnvelope`] - error classification and JSON shape
//! - [`Response`], [`BoxFuture`], [`ResponseExt`] - response plumbing

#![doc(html_root_url = "https://docs.rs/daedalus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod exchange;
mod request_id;
mod types;

pub use error::{ApiError, ErrorCategory, ErrorDetail, ErrorEnvelope};
pub use exchange::{Exchange, REQUEST_ID_HEADER};
pub use request_id::RequestId;
pub use types::{BoxFuture, Response, ResponseExt};

pub use daedalus_router::Params;

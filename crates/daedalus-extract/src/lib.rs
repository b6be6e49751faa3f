//! # Daedalus Extract
//!
//! Typed decoding of request data out of an [`Exchange`](daedalus_core::Exchange).
//!
//! | Decoder | Source | Description |
//! |---------|--------|-------------|
//! | [`decode_query`] | Query string | `serde_urlencoded` over the raw query |
//! | [`decode_form`] | Request body | `serde_urlencoded` over a UTF-8 body |
//! | [`decode_json`] | Body or frame | `serde_json` over the bytes |
//!
//! Body decoders take a size limit, normally [`DEFAULT_MAX_BODY_SIZE`] or the
//! route's configured one.
//!
//! ```rust
//! use daedalus_core::Exchange;
//! use daedalus_extract::decode_query;
//! use http::Method;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Hello {
//!     name: String,
//! }
//!
//! let exchange = Exchange::new(Method::GET, "/hello?name=ada".parse().unwrap());
//! let hello: Hello = decode_query(&exchange).unwrap();
//! assert_eq!(hello.name, "ada");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod extractor;

pub use error::{ExtractionError, ExtractionSource};
pub use extractor::{decode_form, decode_json, decode_query, DEFAULT_MAX_BODY_SIZE};

//! HTTP server for Daedalus pipelines.
//!
//! Hosts the router produced by a
//! [`Registrar`](daedalus_pipeline::Registrar) on hyper's HTTP/1 connection
//! driver:
//!
//! - `404` for unknown paths, `405` with `Allow` for known paths
//! - per-request timeout around body collection and chain execution
//! - WebSocket sessions handed off after the `101` response
//! - graceful shutdown that drains open connections
//! - the provider registry sealed before the first connection
//!
//! # Example
//!
//! ```rust,no_run
//! use daedalus_pipeline::Registrar;
//! use daedalus_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), daedalus_server::ServerError> {
//!     let registrar = Registrar::new();
//!     Server::builder()
//!         .router(registrar.into_router())
//!         .http_addr("0.0.0.0:8080")
//!         .build()
//!         .run()
//!         .await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod server;
mod shutdown;

pub use error::ServerError;
pub use server::{ChainRouter, Server, ServerBuilder};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

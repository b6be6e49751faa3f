//! # Daedalus
//!
//! Declarative request pipelines for an HTTP router. A route is a path, a
//! business handler and a spec string:
//!
//! ```text
//! "req=QJ|auth=jwt|handle|rsp=json@general"
//!   │      │        │      └─ encode the result as JSON in a {code,message,data} wrapper
//!   │      │        └──────── call the handler with the decoded request
//!   │      └───────────────── require a structurally valid, unexpired JWT
//!   └──────────────────────── decode query + JSON body
//! ```
//!
//! Stages run in spec order and share one typed context per request, so the
//! handler sees what `auth` produced and `rsp` sees what the handler returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daedalus::prelude::*;
//! use serde::Deserialize;
//! use serde_json::{json, Value};
//!
//! #[derive(Deserialize)]
//! struct Hello {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registrar = Registrar::new().with_default_spec("req=J|handle|rsp=json@general");
//!     registrar.post(
//!         "/hello",
//!         |_ctx: &mut Context<(), (), Hello, Value>, req: Req<(), (), Hello>| {
//!             Box::pin(async move {
//!                 let hello = req.json.ok_or_else(ApiError::unknown)?;
//!                 Ok(json!({ "greeting": format!("hello {}", hello.name) }))
//!             })
//!         },
//!         "",
//!     )?;
//!
//!     Server::builder()
//!         .router(registrar.into_router())
//!         .http_addr("0.0.0.0:8080")
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use daedalus_core as core;

// Re-export router types
pub use daedalus_router as router;

// Re-export extraction types
pub use daedalus_extract as extract;

// Re-export WebSocket types
pub use daedalus_ws as ws;

// Re-export the pipeline builder
pub use daedalus_pipeline as pipeline;

// Re-export logging setup
pub use daedalus_telemetry as telemetry;

// Re-export configuration
pub use daedalus_config as config;

// Re-export server types
pub use daedalus_server as server;

/// Prelude module for convenient imports.
///
/// ```rust
/// use daedalus::prelude::*;
///
/// let spec = PipelineSpec::parse("req=QJ|handle|rsp");
/// assert_eq!(spec.len(), 3);
/// ```
pub mod prelude {
    pub use daedalus_core::{ApiError, BoxFuture, Exchange, RequestId, Response};

    pub use daedalus_pipeline::{
        handler_fn, AuthResult, ChainOptions, Context, Outcome, PipelineError, PipelineResult,
        PipelineSpec, Provider, ProviderContext, ProviderRegistry, Registrar, Req, WsResult,
    };

    pub use daedalus_config::{ConfigLoader, DaedalusConfig};

    pub use daedalus_telemetry::{init_logging, LogConfig, LogFormat};

    pub use daedalus_server::{Server, ShutdownSignal};
}

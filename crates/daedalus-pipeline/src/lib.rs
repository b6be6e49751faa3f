//! # Daedalus Pipeline
//!
//! Declarative request pipelines. A spec string picks and orders the stages
//! a route runs; the stages share one typed context per request.
//!
//! ```text
//! "req=QJ|auth=jwt|handle|rsp=json@general"
//!
//!   req ──▶ auth ──▶ handle ──▶ rsp
//!    │        │         │         │
//!    ▼        ▼         ▼         ▼
//!  ctx.req  ctx.auth  ctx.handle  exchange response
//! ```
//!
//! ## Stages
//!
//! | Token | Stage | Slot written |
//! |-------|-------|--------------|
//! | `req[=QFJ]` | decodes query / form / JSON | `req` |
//! | `auth=<scheme>` | `jwt`, `bearer`, `api_key`, or `auth.<scheme>` from the registry | `auth` |
//! | `handle` | business handler | `handle` |
//! | `rsp[=media@wrapper]` | encodes the handler result | response |
//! | `ws_handle[=protocols]` | WebSocket upgrade and frame loop | `ws` |
//! | anything else | looked up in the [`ProviderRegistry`] | |
//!
//! Tokens are resolved when the route is registered. In strict mode (the
//! default) a token no tier can resolve fails the registration.
//!
//! ## Example
//!
//! ```
//! use daedalus_core::{ApiError, Exchange};
//! use daedalus_pipeline::{Context, Endpoint, Registrar, Req};
//! use http::{Method, StatusCode};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Hello {
//!     name: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let mut registrar = Registrar::new();
//! let chain = registrar
//!     .get(
//!         "/hello",
//!         |_ctx: &mut Context<Hello, (), (), String>, req: Req<Hello, (), ()>| {
//!             Box::pin(async move {
//!                 let hello = req.query.ok_or_else(ApiError::unknown)?;
//!                 Ok(format!("hello {}", hello.name))
//!             })
//!         },
//!         "req=Q|handle|rsp",
//!     )
//!     .unwrap();
//! assert_eq!(chain.stage_names(), ["req", "handle", "rsp"]);
//!
//! let reply = chain
//!     .serve(Exchange::new(Method::GET, "/hello?name=ada".parse().unwrap()))
//!     .await;
//! assert_eq!(reply.status(), StatusCode::OK);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chain;
mod context;
mod error;
mod indexer;
mod provider;
mod registrar;
mod registry;
mod resolver;
mod spec;
pub mod stages;
mod types;

pub use chain::{Chain, Endpoint, Reply};
pub use context::{AuthResult, Context, Req, ReqSlot, WsResult};
pub use error::{PipelineError, PipelineResult};
pub use indexer::Indexer;
pub use provider::{names, Outcome, Provider, ProviderContext};
pub use registrar::{Registrar, RouteInfo};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use resolver::{ChainOptions, ResolveScope, Resolver, Tier};
pub use spec::{PipelineSpec, Token, ELLIPSIS};
pub use stages::{Stage, WsSession};
pub use types::{handler_fn, HandlerFn, Payload, ReplyPayload};

pub use daedalus_core::BoxFuture;

//! The stage abstraction.
//!
//! Built-in decoders, encoders and handler stages are typed and live in
//! [`Stage`](crate::Stage). Authenticators and user-registered stages implement
//! the object-safe [`Provider`] trait and see the request through
//! [`ProviderContext`].
//!
//! # Example
//!
//! ```
//! use daedalus_pipeline::{BoxFuture, Outcome, Provider, ProviderContext};
//!
//! struct Audit;
//!
//! impl Provider for Audit {
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//!
//!     fn handle<'a>(&'a self, ctx: &'a mut dyn ProviderContext) -> BoxFuture<'a, Outcome> {
//!         Box::pin(async move {
//!             ctx.exchange_mut().insert_state("audited", true);
//!             Outcome::Continue
//!         })
//!     }
//! }
//! ```

use daedalus_core::{ApiError, BoxFuture, Exchange, RequestId};
use daedalus_extract::ExtractionError;

use crate::context::{AuthResult, Context};
use crate::error::PipelineError;
use crate::indexer::Indexer;

/// Well-known stage names.
pub mod names {
    /// Request decoder.
    pub const REQ: &str = "req";
    /// Response encoder.
    pub const RSP: &str = "rsp";
    /// Authenticator.
    pub const AUTH: &str = "auth";
    /// Business handler.
    pub const HANDLE: &str = "handle";
    /// WebSocket handler.
    pub const WS_HANDLE: &str = "ws_handle";
}

/// What a stage tells the chain driver.
#[derive(Debug)]
#[must_use]
pub enum Outcome {
    /// Run the next stage.
    Continue,
    /// Stop and answer with this error.
    Abort(PipelineError),
}

impl Outcome {
    /// True for [`Outcome::Continue`].
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// The untyped view of a [`Context`] given to [`Provider`]s.
pub trait ProviderContext: Send {
    /// The transport handle.
    fn exchange(&self) -> &Exchange;

    /// The transport handle, mutably.
    fn exchange_mut(&mut self) -> &mut Exchange;

    /// Id of the current request.
    fn request_id(&self) -> RequestId;

    /// The chain's indexer.
    fn indexer(&self) -> &Indexer;

    /// The `auth` slot.
    fn auth(&self) -> Option<&AuthResult>;

    /// Writes the `auth` slot.
    fn set_auth(&mut self, auth: AuthResult);

    /// True once a `req` stage has written its slot.
    fn has_req_slot(&self) -> bool;

    /// The decode failure recorded by the `req` stage.
    fn decode_error(&self) -> Option<&ExtractionError>;

    /// True once a `handle` stage has written its slot.
    fn has_handle_result(&self) -> bool;

    /// The business error recorded by the `handle` stage.
    fn handle_error(&self) -> Option<&ApiError>;
}

impl<Q, F, J, P> ProviderContext for Context<Q, F, J, P>
where
    Q: Send,
    F: Send,
    J: Send,
    P: Send,
{
    fn exchange(&self) -> &Exchange {
        Context::exchange(self)
    }

    fn exchange_mut(&mut self) -> &mut Exchange {
        Context::exchange_mut(self)
    }

    fn request_id(&self) -> RequestId {
        Context::request_id(self)
    }

    fn indexer(&self) -> &Indexer {
        Context::indexer(self)
    }

    fn auth(&self) -> Option<&AuthResult> {
        Context::auth(self)
    }

    fn set_auth(&mut self, auth: AuthResult) {
        Context::set_auth(self, auth);
    }

    fn has_req_slot(&self) -> bool {
        self.req_slot().is_some()
    }

    fn decode_error(&self) -> Option<&ExtractionError> {
        self.req_slot().and_then(|slot| slot.error.as_ref())
    }

    fn has_handle_result(&self) -> bool {
        self.handle_result().is_some()
    }

    fn handle_error(&self) -> Option<&ApiError> {
        self.handle_result().and_then(|r| r.as_ref().err())
    }
}

/// A named, object-safe pipeline stage.
pub trait Provider: Send + Sync + 'static {
    /// Stage name, used in logs and `Chain::stage_names`.
    fn name(&self) -> &str;

    /// Runs the stage against the request's context.
    fn handle<'a>(&'a self, ctx: &'a mut dyn ProviderContext) -> BoxFuture<'a, Outcome>;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").field("name", &self.name()).finish()
    }
}

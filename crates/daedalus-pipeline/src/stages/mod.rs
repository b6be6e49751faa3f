//! Built-in stages.
//!
//! The chain stores its stages as [`Stage`] values: one variant per
//! built-in kind, plus [`Stage::Dyn`] for authenticators and providers
//! installed on a [`ProviderRegistry`](crate::ProviderRegistry).

mod auth;
mod handle;
mod req;
mod rsp;
mod ws_handle;

pub use auth::{AuthProvider, AuthScheme, API_KEY_HEADER};
pub use handle::HandleProvider;
pub use req::ReqProvider;
pub use rsp::{Media, RspProvider, Wrapper};
pub(crate) use rsp::render_unencoded_error;
pub use ws_handle::{WsHandleProvider, WsSession};

use std::sync::Arc;

use crate::context::Context;
use crate::provider::{names, Outcome, Provider};
use crate::types::{Payload, ReplyPayload};

/// One wired stage of a chain.
pub enum Stage<Q, F, J, P> {
    /// Request decoder.
    Req(Arc<ReqProvider>),
    /// Business handler.
    Handle(HandleProvider<Q, F, J, P>),
    /// Response encoder.
    Rsp(Arc<RspProvider>),
    /// WebSocket handler.
    WsHandle(WsHandleProvider<Q, F, J, P>),
    /// Authenticator or registry provider.
    Dyn(Arc<dyn Provider>),
}

impl<Q, F, J, P> Stage<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    /// Stage name as it appears in logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Req(_) => names::REQ,
            Self::Handle(_) => names::HANDLE,
            Self::Rsp(_) => names::RSP,
            Self::WsHandle(_) => names::WS_HANDLE,
            Self::Dyn(provider) => provider.name(),
        }
    }

    /// Runs the stage against the request's context.
    pub async fn run(&self, ctx: &mut Context<Q, F, J, P>) -> Outcome {
        match self {
            Self::Req(provider) => provider.run(ctx),
            Self::Handle(provider) => provider.run(ctx).await,
            Self::Rsp(provider) => provider.run(ctx),
            Self::WsHandle(provider) => provider.run(ctx),
            Self::Dyn(provider) => provider.handle(ctx).await,
        }
    }
}

impl<Q, F, J, P> std::fmt::Debug for Stage<Q, F, J, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Req(p) => f.debug_tuple("Req").field(p).finish(),
            Self::Handle(_) => f.write_str("Handle"),
            Self::Rsp(p) => f.debug_tuple("Rsp").field(p).finish(),
            Self::WsHandle(p) => f.debug_tuple("WsHandle").field(&p.protocols()).finish(),
            Self::Dyn(p) => f.debug_tuple("Dyn").field(&p.name()).finish(),
        }
    }
}

//! Token to stage resolution.
//!
//! Each token is offered to an ordered list of tiers; the first tier that
//! returns a stage wins:
//!
//! 1. handler-aware: `handle`, `ws_handle`
//! 2. built-in: `req`, `rsp`, `auth`
//! 3. registry: the token key, or `auth.<scheme>` for authenticators
//!
//! A tier returns `Err` when it recognises the token but cannot use its
//! value, `Ok(None)` when the token is not its business.

use daedalus_extract::DEFAULT_MAX_BODY_SIZE;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::provider::names;
use crate::registry::ProviderRegistry;
use crate::spec::{PipelineSpec, Token};
use crate::stages::{
    AuthProvider, AuthScheme, HandleProvider, ReqProvider, RspProvider, Stage, WsHandleProvider,
};
use crate::types::{HandlerFn, Payload, ReplyPayload};

/// Chain build options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOptions {
    /// Fail on unresolved tokens instead of dropping them.
    pub strict: bool,
    /// Largest request body or frame the decoder accepts.
    pub max_body_size: usize,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            strict: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// What a tier can see while resolving a token.
pub struct ResolveScope<'s, Q, F, J, P> {
    /// The route's business handler.
    pub handler: &'s HandlerFn<Q, F, J, P>,
    /// Registry consulted by the last tier.
    pub registry: &'s ProviderRegistry,
    /// Build options.
    pub options: &'s ChainOptions,
}

/// One resolution tier.
pub type Tier<Q, F, J, P> =
    fn(&Token, &ResolveScope<'_, Q, F, J, P>) -> PipelineResult<Option<Stage<Q, F, J, P>>>;

/// An ordered list of named tiers.
pub struct Resolver<Q, F, J, P> {
    tiers: Vec<(&'static str, Tier<Q, F, J, P>)>,
}

impl<Q, F, J, P> Default for Resolver<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    fn default() -> Self {
        Self {
            tiers: vec![
                ("handler", handler_tier::<Q, F, J, P> as Tier<Q, F, J, P>),
                ("builtin", builtin_tier::<Q, F, J, P> as Tier<Q, F, J, P>),
                ("registry", registry_tier::<Q, F, J, P> as Tier<Q, F, J, P>),
            ],
        }
    }
}

impl<Q, F, J, P> Resolver<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    /// Names of the tiers, in the order they are consulted.
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|(name, _)| *name).collect()
    }

    /// Resolves one token, or `None` if no tier claims it.
    pub fn resolve_token(
        &self,
        token: &Token,
        scope: &ResolveScope<'_, Q, F, J, P>,
    ) -> PipelineResult<Option<Stage<Q, F, J, P>>> {
        for (tier, resolve) in &self.tiers {
            if let Some(stage) = resolve(token, scope)? {
                debug!(token = %token, tier, "token resolved");
                return Ok(Some(stage));
            }
        }
        Ok(None)
    }

    /// Resolves every token of `spec`, keeping token order.
    ///
    /// Unresolved tokens fail the build in strict mode and are dropped with
    /// a warning otherwise.
    pub fn resolve(
        &self,
        spec: &PipelineSpec,
        scope: &ResolveScope<'_, Q, F, J, P>,
    ) -> PipelineResult<Vec<Stage<Q, F, J, P>>> {
        let mut stages = Vec::with_capacity(spec.len());
        let mut unresolved = Vec::new();
        for token in spec {
            match self.resolve_token(token, scope)? {
                Some(stage) => stages.push(stage),
                None => unresolved.push(token.to_string()),
            }
        }
        if unresolved.is_empty() {
            return Ok(stages);
        }
        let listed = unresolved
            .iter()
            .map(|t| format!("`{t}`"))
            .collect::<Vec<_>>()
            .join(", ");
        if scope.options.strict {
            return Err(PipelineError::Configuration(format!(
                "unresolved tokens in `{spec}`: {listed}"
            )));
        }
        warn!(spec = %spec, tokens = %listed, "dropping unresolved tokens");
        Ok(stages)
    }
}

fn handler_tier<Q, F, J, P>(
    token: &Token,
    scope: &ResolveScope<'_, Q, F, J, P>,
) -> PipelineResult<Option<Stage<Q, F, J, P>>>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    let stage = match token.key.as_str() {
        names::HANDLE => Stage::Handle(HandleProvider::new(Arc::clone(scope.handler))),
        names::WS_HANDLE => {
            Stage::WsHandle(WsHandleProvider::new(&token.value, Arc::clone(scope.handler)))
        }
        _ => return Ok(None),
    };
    Ok(Some(stage))
}

fn builtin_tier<Q, F, J, P>(
    token: &Token,
    scope: &ResolveScope<'_, Q, F, J, P>,
) -> PipelineResult<Option<Stage<Q, F, J, P>>>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    let stage = match token.key.as_str() {
        names::REQ => Stage::Req(Arc::new(ReqProvider::parse(
            &token.value,
            scope.options.max_body_size,
        )?)),
        names::RSP => Stage::Rsp(Arc::new(RspProvider::parse(&token.value)?)),
        names::AUTH => match AuthScheme::parse(&token.value) {
            Some(scheme) => {
                if scheme == AuthScheme::Jwt {
                    warn!("auth=jwt does not verify token signatures");
                }
                Stage::Dyn(Arc::new(AuthProvider::new(scheme)))
            }
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(stage))
}

fn registry_tier<Q, F, J, P>(
    token: &Token,
    scope: &ResolveScope<'_, Q, F, J, P>,
) -> PipelineResult<Option<Stage<Q, F, J, P>>>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    if token.key.is_empty() {
        return Ok(None);
    }
    let provider = if token.key == names::AUTH {
        let scheme = token.value.trim();
        if scheme.is_empty() {
            return Ok(None);
        }
        scope.registry.create(&format!("auth.{scheme}"), "")
    } else {
        scope.registry.create(&token.key, &token.value)
    };
    Ok(provider.map(Stage::Dyn))
}

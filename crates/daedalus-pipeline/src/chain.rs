//! Chains: resolved stages plus the driver that runs them.

use daedalus_core::{BoxFuture, Exchange, Response, ResponseExt};
use http::StatusCode;
use std::sync::Arc;
use tracing::debug;

use crate::context::Context;
use crate::error::PipelineResult;
use crate::indexer::Indexer;
use crate::provider::Outcome;
use crate::registry::ProviderRegistry;
use crate::resolver::{ChainOptions, ResolveScope, Resolver};
use crate::spec::PipelineSpec;
use crate::stages::{render_unencoded_error, Stage, WsHandleProvider, WsSession};
use crate::types::{HandlerFn, Payload, ReplyPayload};

/// What a chain hands back to the transport.
pub enum Reply {
    /// A complete HTTP response.
    Response(Response),
    /// A `101` response plus the frame loop to run once the connection is
    /// upgraded.
    Upgrade {
        /// The `101 Switching Protocols` response.
        response: Response,
        /// Frame loop owning the request's context.
        session: WsSession,
    },
}

impl Reply {
    /// Status of the HTTP response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Response(response) | Self::Upgrade { response, .. } => response.status(),
        }
    }

    /// The HTTP response, dropping any session.
    pub fn into_response(self) -> Response {
        match self {
            Self::Response(response) | Self::Upgrade { response, .. } => response,
        }
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response(response) => f.debug_tuple("Response").field(&response.status()).finish(),
            Self::Upgrade { response, .. } => f
                .debug_struct("Upgrade")
                .field("status", &response.status())
                .finish_non_exhaustive(),
        }
    }
}

/// The transport-facing side of a chain.
///
/// Erases the chain's type parameters so chains of different request and
/// response types can share one router.
pub trait Endpoint: Send + Sync + 'static {
    /// Drives one request through the chain.
    fn serve(&self, exchange: Exchange) -> BoxFuture<'_, Reply>;

    /// Names of the wired stages, in order.
    fn stage_names(&self) -> Vec<String>;
}

/// The stages wired for one route, with their shared [`Indexer`].
pub struct Chain<Q, F, J, P> {
    spec: PipelineSpec,
    stages: Vec<Stage<Q, F, J, P>>,
    indexer: Arc<Indexer>,
    ws: Option<WsHandleProvider<Q, F, J, P>>,
}

impl<Q, F, J, P> Chain<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    /// Resolves `spec` into stages and indexes the decoder and encoder.
    pub fn build(
        spec: &PipelineSpec,
        handler: HandlerFn<Q, F, J, P>,
        registry: &ProviderRegistry,
        options: &ChainOptions,
    ) -> PipelineResult<Self> {
        let scope = ResolveScope {
            handler: &handler,
            registry,
            options,
        };
        let stages = Resolver::default().resolve(spec, &scope)?;

        let mut indexer = Indexer::default();
        let mut ws = None;
        for stage in &stages {
            match stage {
                Stage::Req(provider) => indexer.offer_req(provider),
                Stage::Rsp(provider) => indexer.offer_rsp(provider),
                Stage::WsHandle(provider) if ws.is_none() => ws = Some(provider.clone()),
                _ => {}
            }
        }

        Ok(Self {
            spec: spec.clone(),
            stages,
            indexer: Arc::new(indexer),
            ws,
        })
    }

    /// The spec this chain was built from, after inheritance.
    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// Number of wired stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True if no stage was wired.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The chain's indexer.
    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    /// Runs one request.
    ///
    /// Creates the request's only [`Context`], hands it to each stage in
    /// order and stops at the first abort.
    pub async fn run(&self, exchange: Exchange) -> Reply {
        let mut ctx = Context::new(exchange, Arc::clone(&self.indexer));
        let request_id = ctx.request_id();

        for stage in &self.stages {
            debug!(%request_id, stage = stage.name(), "running stage");
            if let Outcome::Abort(err) = stage.run(&mut ctx).await {
                debug!(%request_id, stage = stage.name(), error = %err, "chain aborted");
                return Reply::Response(err.into_response(request_id));
            }
        }
        self.finish(ctx)
    }

    fn finish(&self, mut ctx: Context<Q, F, J, P>) -> Reply {
        let upgraded = ctx.ws().is_some_and(|ws| ws.accepted);
        if let (true, Some(ws)) = (upgraded, &self.ws) {
            let response = ctx
                .exchange_mut()
                .take_response()
                .unwrap_or_else(|| Response::empty(StatusCode::SWITCHING_PROTOCOLS));
            return Reply::Upgrade {
                response,
                session: ws.session(ctx),
            };
        }

        if let Some(response) = ctx.exchange_mut().take_response() {
            return Reply::Response(response);
        }
        match ctx.handle_result() {
            Some(Err(err)) => Reply::Response(render_unencoded_error(err)),
            _ => Reply::Response(Response::empty(StatusCode::OK)),
        }
    }
}

impl<Q, F, J, P> Endpoint for Chain<Q, F, J, P>
where
    Q: Payload,
    F: Payload,
    J: Payload,
    P: ReplyPayload,
{
    fn serve(&self, exchange: Exchange) -> BoxFuture<'_, Reply> {
        Box::pin(self.run(exchange))
    }

    fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }
}

impl<Q, F, J, P> std::fmt::Debug for Chain<Q, F, J, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("spec", &self.spec.to_string())
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Req;
    use crate::types::handler_fn;
    use daedalus_core::ApiError;
    use http::Method;

    fn build(spec: &str) -> Chain<(), (), (), String> {
        let handler = handler_fn(|_ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
            Box::pin(async { Err(ApiError::token_expired()) })
        });
        Chain::build(
            &PipelineSpec::parse(spec),
            handler,
            &ProviderRegistry::new(),
            &ChainOptions::default(),
        )
        .unwrap()
    }

    fn get(uri: &str) -> Exchange {
        Exchange::new(Method::GET, uri.parse().unwrap())
    }

    #[test]
    fn test_indexer_records_first_req_and_rsp() {
        let chain = build("req=J|req=Q|handle|rsp=text|rsp=json");
        assert_eq!(chain.len(), 5);
        assert!(chain.indexer().req().unwrap().decodes_json());
        assert_eq!(
            chain.indexer().rsp().unwrap().media(),
            crate::stages::Media::Text
        );
    }

    #[test]
    fn test_empty_spec_builds_empty_chain() {
        let chain = build("");
        assert!(chain.is_empty());
        assert!(chain.indexer().req().is_none());
    }

    #[tokio::test]
    async fn test_empty_chain_answers_200() {
        let reply = build("").run(get("/")).await;
        assert_eq!(reply.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_without_encoder_uses_its_status() {
        let reply = build("req|handle").run(get("/")).await;
        assert_eq!(reply.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_abort_renders_envelope_status() {
        let reply = build("handle|rsp").run(get("/")).await;
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
    }
}

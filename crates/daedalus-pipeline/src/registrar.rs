//! Route registration.
//!
//! A [`Registrar`] turns `(verb, path, handler, spec)` into a [`Chain`] and
//! inserts it into a router of type-erased [`Endpoint`]s. Route specs
//! inherit from the registrar's default spec (see
//! [`PipelineSpec::inherit`]).
//!
//! ```
//! use daedalus_pipeline::{Context, Registrar, Req};
//! use http::Method;
//!
//! let mut registrar = Registrar::new().with_default_spec("req|handle|rsp");
//! registrar
//!     .group("/hello", |hello| {
//!         hello.get(
//!             "/abc",
//!             |_ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
//!                 Box::pin(async { Ok("abc".to_string()) })
//!             },
//!             "",
//!         )?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let router = registrar.into_router();
//! assert!(router.match_route(&Method::GET, "/hello/abc").is_some());
//! ```

use daedalus_core::{ApiError, BoxFuture};
use daedalus_router::Router;
use http::Method;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::{Chain, Endpoint};
use crate::context::{Context, Req};
use crate::error::{PipelineError, PipelineResult};
use crate::registry::ProviderRegistry;
use crate::resolver::ChainOptions;
use crate::spec::PipelineSpec;
use crate::types::{Payload, ReplyPayload};

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP verb (`GET` for WebSocket routes).
    pub method: Method,
    /// Full path pattern, prefix included.
    pub path: String,
    /// Spec after inheritance.
    pub spec: String,
    /// Wired stage names.
    pub stages: Vec<String>,
}

/// Builds chains and collects them in a router.
pub struct Registrar {
    router: Router<Arc<dyn Endpoint>>,
    registry: Arc<ProviderRegistry>,
    options: ChainOptions,
    default_spec: PipelineSpec,
    prefix: String,
    routes: Vec<RouteInfo>,
}

impl Default for Registrar {
    fn default() -> Self {
        Self::new()
    }
}

impl Registrar {
    /// A registrar using the global provider registry and strict resolution.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            registry: ProviderRegistry::global(),
            options: ChainOptions::default(),
            default_spec: PipelineSpec::default(),
            prefix: String::new(),
            routes: Vec::new(),
        }
    }

    /// Sets the base spec for empty and `...` route specs.
    pub fn with_default_spec(mut self, spec: &str) -> Self {
        self.default_spec = PipelineSpec::parse(spec);
        self
    }

    /// Resolves registry tokens against `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the chain build options.
    pub fn with_options(mut self, options: ChainOptions) -> Self {
        self.options = options;
        self
    }

    /// Drops unresolved tokens with a warning.
    pub fn lenient(mut self) -> Self {
        self.options.strict = false;
        self
    }

    /// Fails registration on unresolved tokens.
    pub fn strict(mut self) -> Self {
        self.options.strict = true;
        self
    }

    /// The base spec.
    pub fn default_spec(&self) -> &PipelineSpec {
        &self.default_spec
    }

    /// Registers a GET route.
    pub fn get<Q, F, J, P, H>(
        &mut self,
        path: &str,
        handler: H,
        spec: &str,
    ) -> PipelineResult<Arc<Chain<Q, F, J, P>>>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
        P: ReplyPayload,
        H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Method::GET, path, handler, spec)
    }

    /// Registers a POST route.
    pub fn post<Q, F, J, P, H>(
        &mut self,
        path: &str,
        handler: H,
        spec: &str,
    ) -> PipelineResult<Arc<Chain<Q, F, J, P>>>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
        P: ReplyPayload,
        H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Method::POST, path, handler, spec)
    }

    /// Registers a PUT route.
    pub fn put<Q, F, J, P, H>(
        &mut self,
        path: &str,
        handler: H,
        spec: &str,
    ) -> PipelineResult<Arc<Chain<Q, F, J, P>>>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
        P: ReplyPayload,
        H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Method::PUT, path, handler, spec)
    }

    /// Registers a DELETE route.
    pub fn delete<Q, F, J, P, H>(
        &mut self,
        path: &str,
        handler: H,
        spec: &str,
    ) -> PipelineResult<Arc<Chain<Q, F, J, P>>>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
        P: ReplyPayload,
        H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Method::DELETE, path, handler, spec)
    }

    /// Registers a WebSocket route on GET.
    ///
    /// The handler is called once per inbound frame.
    pub fn ws<Q, F, J, P, H>(
        &mut self,
        path: &str,
        handler: H,
        spec: &str,
    ) -> PipelineResult<Arc<Chain<Q, F, J, P>>>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
        P: ReplyPayload,
        H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(Method::GET, path, handler, spec)
    }

    /// Builds a chain for `spec` and registers it at `method` and `path`.
    ///
    /// Fails when the verb is already registered at that path; the chain
    /// registered first stays in place. In strict mode a spec that is empty
    /// after inheritance is also rejected.
    pub fn register<Q, F, J, P, H>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
        spec: &str,
    ) -> PipelineResult<Arc<Chain<Q, F, J, P>>>
    where
        Q: Payload,
        F: Payload,
        J: Payload,
        P: ReplyPayload,
        H: for<'a> Fn(&'a mut Context<Q, F, J, P>, Req<Q, F, J>) -> BoxFuture<'a, Result<P, ApiError>>
            + Send
            + Sync
            + 'static,
    {
        let path = join_path(&self.prefix, path);
        if self.router.contains(&method, &path) {
            return Err(PipelineError::Configuration(format!(
                "{method} {path} is already registered"
            )));
        }

        let spec = PipelineSpec::parse(spec).inherit(&self.default_spec);
        if spec.is_empty() {
            if self.options.strict {
                return Err(PipelineError::Configuration(format!(
                    "{method} {path} has an empty spec and no default spec"
                )));
            }
            warn!(%method, path = %path, "registering a route with no stages");
        }
        let chain = Arc::new(Chain::build(
            &spec,
            Arc::new(handler),
            &self.registry,
            &self.options,
        )?);
        let endpoint: Arc<dyn Endpoint> = chain.clone();
        self.router
            .route(&method, &path, endpoint)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let stages = chain.stage_names();
        info!(%method, path = %path, spec = %spec, stages = ?stages, "route registered");
        self.routes.push(RouteInfo {
            method,
            path,
            spec: spec.to_string(),
            stages,
        });
        Ok(chain)
    }

    /// Registers routes under a path prefix.
    ///
    /// Groups nest; the prefix is restored when `routes` returns.
    pub fn group<R>(&mut self, prefix: &str, routes: R) -> PipelineResult<()>
    where
        R: FnOnce(&mut Self) -> PipelineResult<()>,
    {
        let saved = self.prefix.clone();
        self.prefix = join_path(&saved, prefix);
        let result = routes(self);
        self.prefix = saved;
        result
    }

    /// Routes registered so far, in registration order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Hands the router to the transport.
    pub fn into_router(self) -> Router<Arc<dyn Endpoint>> {
        self.router
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("default_spec", &self.default_spec.to_string())
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}

//! The HTTP server.
//!
//! One tokio task per connection, hyper's HTTP/1 state machine, and the
//! chain router built by a [`Registrar`](daedalus_pipeline::Registrar).
//! Requests that match a route are buffered, up to the body limit, into an
//! [`Exchange`] and driven through the route's chain under the
//! request timeout. A chain that accepts a WebSocket upgrade hands back a
//! session, which runs on its own task once hyper releases the connection.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use daedalus_config::{PipelineConfig, ServerConfig};
use daedalus_core::{
    ErrorCategory, ErrorEnvelope, Exchange, RequestId, Response, ResponseExt, REQUEST_ID_HEADER,
};
use daedalus_pipeline::{ChainOptions, Endpoint, ProviderRegistry, Reply, WsSession};
use daedalus_router::Router;
use daedalus_ws::handshake::is_websocket_request;
use daedalus_ws::{BoxedIo, WebSocket};

use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Router of type-erased chains, as produced by `Registrar::into_router`.
pub type ChainRouter = Router<Arc<dyn Endpoint>>;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Serves a router of pipeline chains.
///
/// ```rust
/// use daedalus_pipeline::Registrar;
/// use daedalus_server::Server;
/// use std::time::Duration;
///
/// let server = Server::builder()
///     .router(Registrar::new().into_router())
///     .http_addr("127.0.0.1:0")
///     .request_timeout(Duration::from_secs(5))
///     .build();
/// assert_eq!(server.request_timeout(), Duration::from_secs(5));
/// ```
pub struct Server {
    router: ChainRouter,
    http_addr: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    max_body_size: usize,
    registry: Arc<ProviderRegistry>,
}

impl Server {
    /// Starts a builder with default settings and an empty router.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// The configured bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Time budget for body collection plus chain execution.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// How long shutdown waits for connections to drain.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Largest request body buffered before a route's chain runs.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Binds the configured address and serves until SIGTERM or Ctrl+C.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr =
            self.http_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
                    addr: self.http_addr.clone(),
                    reason: e.to_string(),
                })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|origin| ServerError::Bind {
                addr: addr.to_string(),
                origin,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    ///
    /// Seals the provider registry before the first connection is accepted.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        self.registry.seal();
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, routes = self.router.len(), "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            server.serve_connection(stream, remote, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let active = tracker.active_connections();
        if active > 0 {
            info!(active, timeout = ?server.shutdown_timeout, "waiting for connections to drain");
        }
        if tokio::time::timeout(server.shutdown_timeout, tracker.wait_idle())
            .await
            .is_err()
        {
            warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        info!("server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote: SocketAddr,
        shutdown: ShutdownSignal,
    ) {
        let server = Arc::clone(&self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service)
            .with_upgrades();
        tokio::pin!(conn);

        let mut draining = false;
        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        debug!(%remote, error = %e, "connection ended with error");
                    }
                    break;
                }
                () = shutdown.recv(), if !draining => {
                    debug!(%remote, "closing connection for shutdown");
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }

    /// Answers one request.
    ///
    /// Unknown paths get `404`; known paths with another verb get `405` with
    /// an `Allow` header. A body over the limit gets `413` and the chain never
    /// runs. Every response carries `x-request-id`.
    pub async fn handle<B>(&self, mut req: Request<B>) -> Response
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.request_timeout;
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(matched) = self.router.match_route(&method, &path) else {
            return self.unmatched(&method, &path);
        };
        let endpoint = Arc::clone(matched.value);
        let params = matched.params;

        let on_upgrade = is_websocket_request(req.headers()).then(|| hyper::upgrade::on(&mut req));
        let (parts, body) = req.into_parts();

        let limited = Limited::new(body, self.max_body_size);
        let body = match tokio::time::timeout_at(deadline, limited.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.is::<LengthLimitError>() => {
                warn!(%method, %path, limit = self.max_body_size, "request body over limit");
                let request_id = RequestId::new();
                let envelope = ErrorEnvelope::new(
                    ErrorCategory::Validation,
                    "PAYLOAD_TOO_LARGE",
                    format!("request body exceeds {} bytes", self.max_body_size),
                )
                .with_request_id(request_id);
                let mut response = Response::envelope(StatusCode::PAYLOAD_TOO_LARGE, &envelope);
                stamp_request_id(&mut response, request_id);
                return response;
            }
            Ok(Err(e)) => {
                warn!(%method, %path, error = %e, "failed to read request body");
                return error_response(
                    ErrorCategory::Validation,
                    "BODY_READ_ERROR",
                    &format!("failed to read request body: {e}"),
                    RequestId::new(),
                );
            }
            Err(_) => return self.timed_out(&method, &path, RequestId::new()),
        };

        let exchange = Exchange::from_parts(parts, body).with_params(params);
        let request_id = exchange.request_id();

        let reply = match tokio::time::timeout_at(deadline, endpoint.serve(exchange)).await {
            Ok(reply) => reply,
            Err(_) => return self.timed_out(&method, &path, request_id),
        };

        let mut response = match reply {
            Reply::Response(response) => response,
            Reply::Upgrade { response, session } => match on_upgrade {
                Some(on_upgrade) => {
                    spawn_session(on_upgrade, session, request_id);
                    response
                }
                None => {
                    error!(%request_id, "upgrade accepted without an upgradable connection");
                    return error_response(
                        ErrorCategory::Internal,
                        "UPGRADE_UNAVAILABLE",
                        "connection cannot be upgraded",
                        request_id,
                    );
                }
            },
        };

        stamp_request_id(&mut response, request_id);
        daedalus_telemetry::log_request_complete!(
            request_id,
            method,
            path,
            response.status().as_u16(),
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
        );
        response
    }

    fn unmatched(&self, method: &Method, path: &str) -> Response {
        let request_id = RequestId::new();
        match self.router.match_path(path) {
            Some((methods, _)) => {
                let allowed = methods
                    .allowed_methods()
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                debug!(%method, %path, %allowed, "method not allowed");
                let mut response = error_response(
                    ErrorCategory::MethodNotAllowed,
                    "METHOD_NOT_ALLOWED",
                    &format!("{method} is not allowed on {path}"),
                    request_id,
                );
                if let Ok(value) = HeaderValue::from_str(&allowed) {
                    response.headers_mut().insert(ALLOW, value);
                }
                response
            }
            None => {
                debug!(%method, %path, "no route");
                error_response(
                    ErrorCategory::NotFound,
                    "NOT_FOUND",
                    &format!("no route for {path}"),
                    request_id,
                )
            }
        }
    }

    fn timed_out(&self, method: &Method, path: &str, request_id: RequestId) -> Response {
        warn!(%request_id, %method, %path, timeout = ?self.request_timeout, "request timed out");
        error_response(
            ErrorCategory::Timeout,
            "REQUEST_TIMEOUT",
            "request exceeded its time budget",
            request_id,
        )
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("http_addr", &self.http_addr)
            .field("routes", &self.router.len())
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

fn spawn_session(on_upgrade: OnUpgrade, session: WsSession, request_id: RequestId) {
    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let io: BoxedIo = Box::new(TokioIo::new(upgraded));
                session(WebSocket::from_raw(io).await).await;
                debug!(%request_id, "websocket session ended");
            }
            Err(e) => warn!(%request_id, error = %e, "connection upgrade failed"),
        }
    });
}

fn stamp_request_id(response: &mut Response, request_id: RequestId) {
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

fn error_response(
    category: ErrorCategory,
    code: &str,
    message: &str,
    request_id: RequestId,
) -> Response {
    let envelope = ErrorEnvelope::new(category, code, message).with_request_id(request_id);
    let mut response = Response::envelope(category.default_status_code(), &envelope);
    stamp_request_id(&mut response, request_id);
    response
}

/// Builder for [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    router: Option<ChainRouter>,
    http_addr: Option<String>,
    request_timeout: Option<Duration>,
    shutdown_timeout: Option<Duration>,
    max_body_size: Option<usize>,
    registry: Option<Arc<ProviderRegistry>>,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies address and timeouts from the `[server]` configuration section.
    #[must_use]
    pub fn config(self, config: &ServerConfig) -> Self {
        self.http_addr(config.http_addr.clone())
            .request_timeout(Duration::from_secs(config.request_timeout_secs))
            .shutdown_timeout(Duration::from_secs(config.shutdown_timeout_secs))
    }

    /// Copies the body limit from the `[pipeline]` configuration section.
    #[must_use]
    pub fn pipeline(self, config: &PipelineConfig) -> Self {
        self.max_body_size(config.max_body_size)
    }

    /// Sets the chain router.
    #[must_use]
    pub fn router(mut self, router: ChainRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = Some(addr.into());
        self
    }

    /// Sets the per-request timeout. Default is 30 seconds.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the drain timeout used at shutdown. Default is 30 seconds.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Sets the largest request body the server buffers. Defaults to the
    /// chain default of 1 MiB.
    #[must_use]
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }

    /// Sets the registry sealed at startup. Defaults to the global one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            router: self.router.unwrap_or_default(),
            http_addr: self
                .http_addr
                .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_TIMEOUT),
            shutdown_timeout: self.shutdown_timeout.unwrap_or(DEFAULT_TIMEOUT),
            max_body_size: self
                .max_body_size
                .unwrap_or_else(|| ChainOptions::default().max_body_size),
            registry: self.registry.unwrap_or_else(ProviderRegistry::global),
        }
    }
}

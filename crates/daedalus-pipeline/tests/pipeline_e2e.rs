//! End-to-end chain tests.
//!
//! Routes are registered through a [`Registrar`], matched with the router it
//! produces, and driven through [`Endpoint::serve`] the way the server does.

use bytes::Bytes;
use daedalus_core::{ApiError, BoxFuture, Exchange, Response};
use daedalus_pipeline::{
    ChainOptions, Context, Endpoint, Outcome, PipelineError, Provider, ProviderContext,
    ProviderRegistry, Registrar, Reply, Req,
};
use daedalus_router::Router;
use daedalus_ws::{BoxedIo, WebSocket};
use futures_util::{SinkExt, StreamExt};
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::Role;
use tungstenite::Message;

#[derive(Debug, Deserialize)]
struct Greeting {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Paging {
    page: u32,
}

/// A registrar with its own registry so tests do not share global state.
fn registrar() -> (Registrar, Arc<ProviderRegistry>) {
    let registry = Arc::new(ProviderRegistry::new());
    let registrar = Registrar::new().with_registry(Arc::clone(&registry));
    (registrar, registry)
}

async fn dispatch(router: &Router<Arc<dyn Endpoint>>, exchange: Exchange) -> Reply {
    let matched = router
        .match_route(exchange.method(), exchange.path())
        .expect("route registered");
    let endpoint = Arc::clone(matched.value);
    let exchange = exchange.with_params(matched.params);
    endpoint.serve(exchange).await
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: &'static str) -> Exchange {
    Exchange::new(Method::POST, uri.parse().unwrap())
        .with_header("content-type", "application/json")
        .with_body(Bytes::from_static(body.as_bytes()))
}

fn get(uri: &str) -> Exchange {
    Exchange::new(Method::GET, uri.parse().unwrap())
}

// ============================================================================
// Request flow
// ============================================================================

#[tokio::test]
async fn test_full_chain_general_wrapper() {
    let (mut registrar, _) = registrar();
    registrar
        .post(
            "/hello/:id",
            |_ctx: &mut Context<Paging, (), Greeting, Value>, req: Req<Paging, (), Greeting>| {
                Box::pin(async move {
                    let greeting = req.json.ok_or_else(ApiError::unknown)?;
                    Ok(json!({
                        "id": req.params.get("id"),
                        "page": req.query.map(|q| q.page),
                        "hello": greeting.name,
                    }))
                })
            },
            "req=QJ|handle|rsp=json@general",
        )
        .unwrap();
    let router = registrar.into_router();

    let reply = dispatch(&router, post("/hello/7?page=3", r#"{"name":"ada"}"#)).await;
    assert_eq!(reply.status(), StatusCode::OK);
    let body = json_body(reply.into_response()).await;
    assert_eq!(
        body,
        json!({"code": 0, "message": "", "data": {"id": "7", "page": 3, "hello": "ada"}})
    );
}

#[tokio::test]
async fn test_decode_failure_never_reaches_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let (mut registrar, _) = registrar();
    registrar
        .post(
            "/greet",
            move |_ctx: &mut Context<(), (), Greeting, String>, _req: Req<(), (), Greeting>| {
                seen.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok("unreachable".to_string()) })
            },
            "req=J|handle|rsp",
        )
        .unwrap();
    let router = registrar.into_router();

    let reply = dispatch(&router, post("/greet", "{not json")).await;
    assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
    let body = json_body(reply.into_response()).await;
    assert_eq!(body["error"]["code"], "DESERIALIZATION_FAILED");
    assert!(body["request_id"].is_string());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_error_in_band_with_general_wrapper() {
    let (mut registrar, _) = registrar();
    registrar
        .get(
            "/expired",
            |_ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
                Box::pin(async { Err(ApiError::token_expired()) })
            },
            "req|handle|rsp=json@general",
        )
        .unwrap();
    let router = registrar.into_router();

    let reply = dispatch(&router, get("/expired")).await;
    assert_eq!(reply.status(), StatusCode::OK);
    let body = json_body(reply.into_response()).await;
    assert_eq!(body["code"], 55555);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_handler_error_out_of_band_without_wrapper() {
    let (mut registrar, _) = registrar();
    registrar
        .get(
            "/missing",
            |_ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
                Box::pin(async {
                    Err(ApiError::new("UserErr.NOT_FOUND", 40401, "no such user")
                        .with_status(StatusCode::NOT_FOUND))
                })
            },
            "req|handle|rsp",
        )
        .unwrap();
    let router = registrar.into_router();

    let reply = dispatch(&router, get("/missing")).await;
    assert_eq!(reply.status(), StatusCode::NOT_FOUND);
    let body = json_body(reply.into_response()).await;
    assert_eq!(body, json!({"error": "UserErr.NOT_FOUND", "detail": "no such user"}));
}

#[tokio::test]
async fn test_auth_abort_skips_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let (mut registrar, _) = registrar();
    registrar
        .get(
            "/private",
            move |ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
                seen.fetch_add(1, Ordering::SeqCst);
                let subject = ctx.auth().and_then(|a| a.subject.clone()).unwrap_or_default();
                Box::pin(async move { Ok(subject) })
            },
            "req|auth=api_key|handle|rsp",
        )
        .unwrap();
    let router = registrar.into_router();

    let reply = dispatch(&router, get("/private")).await;
    assert_eq!(reply.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let reply = dispatch(&router, get("/private").with_header("x-api-key", "k-1")).await;
    assert_eq!(reply.status(), StatusCode::OK);
    assert_eq!(json_body(reply.into_response()).await, json!("k-1"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Context identity
// ============================================================================

type Sightings = Arc<Mutex<Vec<(String, String, usize)>>>;

/// Records which context it saw, by request id and address.
struct Witness(Sightings);

impl Provider for Witness {
    fn name(&self) -> &str {
        "witness"
    }

    fn handle<'a>(&'a self, ctx: &'a mut dyn ProviderContext) -> BoxFuture<'a, Outcome> {
        let address = std::ptr::addr_of!(*ctx).cast::<()>() as usize;
        let request_id = ctx.request_id().to_string();
        self.0
            .lock()
            .push(("witness".to_string(), request_id, address));
        Box::pin(async { Outcome::Continue })
    }
}

#[tokio::test]
async fn test_one_context_per_request() {
    let sightings: Sightings = Arc::new(Mutex::new(Vec::new()));
    let (registrar, registry) = registrar();
    let witness_sightings = Arc::clone(&sightings);
    registry
        .register("witness", move |_: &str| {
            Arc::new(Witness(Arc::clone(&witness_sightings))) as Arc<dyn Provider>
        })
        .unwrap();

    let handler_sightings = Arc::clone(&sightings);
    let mut registrar = registrar;
    registrar
        .get(
            "/who",
            move |ctx: &mut Context<(), (), (), String>, _req: Req<(), (), ()>| {
                let address = std::ptr::addr_of!(*ctx).cast::<()>() as usize;
                handler_sightings.lock().push((
                    "handler".to_string(),
                    ctx.request_id().to_string(),
                    address,
                ));
                Box::pin(async {
                    tokio::task::yield_now().await;
                    Ok("ok".to_string())
                })
            },
            "req|witness|handle|rsp",
        )
        .unwrap();
    let router = registrar.into_router();

    let (a, b) = tokio::join!(dispatch(&router, get("/who")), dispatch(&router, get("/who")));
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);

    let sightings = sightings.lock().clone();
    assert_eq!(sightings.len(), 4);
    let mut request_ids: Vec<&String> = sightings.iter().map(|(_, id, _)| id).collect();
    request_ids.sort();
    request_ids.dedup();
    assert_eq!(request_ids.len(), 2, "two requests, two contexts");

    for id in request_ids {
        let seen: Vec<_> = sightings.iter().filter(|(_, rid, _)| rid == id).collect();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0].0, seen[1].0);
        assert_eq!(seen[0].2, seen[1].2, "stages of one request share a context");
    }
}

// ============================================================================
// Registration
// ============================================================================

fn noop(
    _ctx: &mut Context<(), (), (), String>,
    _req: Req<(), (), ()>,
) -> BoxFuture<'_, Result<String, ApiError>> {
    Box::pin(async { Ok(String::new()) })
}

#[test]
fn test_strict_rejects_unknown_token() {
    let (mut registrar, _) = registrar();
    let err = registrar.get("/x", noop, "req|audit|handle").unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(ref msg) if msg.contains("audit")));
    assert!(registrar.routes().is_empty());
}

#[test]
fn test_lenient_drops_unknown_token() {
    let (registrar, _) = registrar();
    let mut registrar = registrar.lenient();
    let chain = registrar.get("/x", noop, "req|audit|handle|rsp").unwrap();
    assert_eq!(chain.stage_names(), ["req", "handle", "rsp"]);
}

#[test]
fn test_sealed_registry_rejects_late_providers() {
    let (mut registrar, registry) = registrar();
    registry
        .register("witness", |_: &str| {
            Arc::new(Witness(Arc::default())) as Arc<dyn Provider>
        })
        .unwrap();
    registry.seal();

    let err = registry
        .register("late", |_: &str| {
            Arc::new(Witness(Arc::default())) as Arc<dyn Provider>
        })
        .unwrap_err();
    assert!(matches!(err, PipelineError::RegistrySealed(_)));

    let chain = registrar.get("/x", noop, "witness|req|handle").unwrap();
    assert_eq!(chain.len(), 3);
    assert!(registrar.get("/y", noop, "late|req|handle").is_err());
}

#[test]
fn test_default_spec_inheritance() {
    let (registrar, _) = registrar();
    let mut registrar = registrar.with_default_spec("req|auth=api_key|handle|rsp");

    let plain = registrar.get("/plain", noop, "").unwrap();
    assert_eq!(plain.spec().to_string(), "req|auth=api_key|handle|rsp");

    let swapped = registrar.get("/swapped", noop, "...|auth=bearer|...").unwrap();
    assert_eq!(swapped.spec().to_string(), "req|auth=bearer|handle|rsp");

    let own = registrar.get("/own", noop, "req|handle").unwrap();
    assert_eq!(own.stage_names(), ["req", "handle"]);
}

#[test]
fn test_inheritance_without_default_spec() {
    let (mut registrar, _) = registrar();
    let chain = registrar.get("/p", noop, "req|...|handle|rsp").unwrap();
    assert_eq!(chain.stage_names(), ["req", "handle", "rsp"]);

    let (registrar, _) = self::registrar();
    let mut registrar = registrar.with_default_spec("req|handle");
    let chain = registrar.get("/q", noop, "req|handle|rsp|...|auth=bearer").unwrap();
    assert_eq!(chain.spec().to_string(), "req|handle|rsp|auth=bearer");
}

#[test]
fn test_empty_effective_spec() {
    let (mut registrar, _) = registrar();
    let err = registrar.get("/empty", noop, "").unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(ref msg) if msg.contains("/empty")));
    assert!(registrar.routes().is_empty());

    let (registrar, _) = self::registrar();
    let mut registrar = registrar.lenient();
    let chain = registrar.get("/empty", noop, "").unwrap();
    assert!(chain.is_empty());
}

#[test]
fn test_groups_prefix_paths() {
    let (mut registrar, _) = registrar();
    registrar
        .group("/api", |api| {
            api.group("/v1", |v1| {
                v1.get("/users", noop, "req|handle")?;
                Ok(())
            })?;
            api.delete("/users/:id", noop, "req|handle")?;
            Ok(())
        })
        .unwrap();
    registrar.get("/health", noop, "req|handle").unwrap();

    let paths: Vec<_> = registrar
        .routes()
        .iter()
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    assert_eq!(
        paths,
        ["GET /api/v1/users", "DELETE /api/users/:id", "GET /health"]
    );
}

#[tokio::test]
async fn test_same_path_different_verbs_are_independent() {
    let (mut registrar, _) = registrar();
    let get_chain = registrar
        .get(
            "/items",
            |_ctx: &mut Context<Paging, (), (), String>, req: Req<Paging, (), ()>| {
                Box::pin(async move { Ok(format!("page {}", req.query.map_or(0, |q| q.page))) })
            },
            "req=Q|handle|rsp=text",
        )
        .unwrap();
    let post_chain = registrar
        .post(
            "/items",
            |_ctx: &mut Context<(), (), Greeting, Value>, req: Req<(), (), Greeting>| {
                Box::pin(async move { Ok(json!({ "created": req.json.map(|g| g.name) })) })
            },
            "req=J|handle|rsp=json@general",
        )
        .unwrap();

    assert!(!Arc::ptr_eq(get_chain.indexer(), post_chain.indexer()));
    assert!(get_chain.indexer().req().unwrap().decodes_query());
    assert!(post_chain.indexer().req().unwrap().decodes_json());

    let err = registrar
        .get("/items", noop, "req|handle|rsp")
        .unwrap_err();
    assert!(err.to_string().contains("GET /items"));

    let router = registrar.into_router();
    let reply = dispatch(&router, get("/items?page=2")).await;
    let bytes = reply.into_response().into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"page 2");

    let reply = dispatch(&router, post("/items", r#"{"name":"box"}"#)).await;
    assert_eq!(json_body(reply.into_response()).await["data"]["created"], "box");
}

#[test]
fn test_options_flow_into_decoder() {
    let (registrar, _) = registrar();
    let mut registrar = registrar.with_options(ChainOptions {
        strict: true,
        max_body_size: 64,
    });
    let chain = registrar.get("/x", noop, "req=J|handle").unwrap();
    assert_eq!(chain.indexer().req().unwrap().max_body_size(), 64);
}

// ============================================================================
// WebSocket
// ============================================================================

#[derive(Debug, Deserialize)]
struct Ping {
    n: i64,
}

fn upgrade(uri: &str) -> Exchange {
    get(uri)
        .with_header("connection", "Upgrade")
        .with_header("upgrade", "websocket")
        .with_header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .with_header("sec-websocket-version", "13")
        .with_header("sec-websocket-protocol", "echo.v1")
        .with_header("x-api-key", "k-ws")
}

#[tokio::test]
async fn test_websocket_session_keeps_context() {
    let (mut registrar, _) = registrar();
    registrar
        .ws(
            "/ws",
            |ctx: &mut Context<(), (), Ping, Value>, req: Req<(), (), Ping>| {
                let subject = ctx.auth().and_then(|a| a.subject.clone());
                let received = ctx.ws().map_or(0, |ws| ws.received);
                Box::pin(async move {
                    let ping = req.json.ok_or_else(ApiError::unknown)?;
                    Ok(json!({ "pong": ping.n, "subject": subject, "frame": received }))
                })
            },
            "req=J|auth=api_key|ws_handle=echo.v1|rsp=json@general",
        )
        .unwrap();
    let router = registrar.into_router();

    let plain = dispatch(&router, get("/ws").with_header("x-api-key", "k-ws")).await;
    assert_eq!(plain.status(), StatusCode::BAD_REQUEST);

    let Reply::Upgrade { response, session } = dispatch(&router, upgrade("/ws")).await else {
        panic!("upgrade not accepted");
    };
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(response.headers()["sec-websocket-protocol"], "echo.v1");

    let (server_io, client_io) = tokio::io::duplex(4096);
    let server = tokio::spawn(async move {
        let socket = WebSocket::from_raw(Box::new(server_io) as BoxedIo).await;
        session(socket).await;
    });

    let mut client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    client.send(Message::text(r#"{"n":5}"#.to_string())).await.unwrap();
    let reply = client.next().await.unwrap().unwrap();
    let reply: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert_eq!(reply["data"], json!({"pong": 5, "subject": "k-ws", "frame": 1}));

    client.send(Message::text("oops".to_string())).await.unwrap();
    let reply = client.next().await.unwrap().unwrap();
    let reply: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert_eq!(reply["error"], "DESERIALIZATION_FAILED");

    client.close(None).await.unwrap();
    server.await.unwrap();
}


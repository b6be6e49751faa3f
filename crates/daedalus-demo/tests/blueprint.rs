//! The demo blueprint served through `Server::handle`.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use daedalus::prelude::*;
use daedalus_demo::audit::register_providers;
use daedalus_demo::blueprint::register_routes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};

fn server() -> (Server, Vec<String>) {
    let registry = Arc::new(ProviderRegistry::new());
    register_providers(&registry).unwrap();

    let mut registrar = Registrar::new()
        .with_registry(Arc::clone(&registry))
        .with_default_spec("req=QJ|handle|rsp=json");
    register_routes(&mut registrar).unwrap();
    let paths = registrar
        .routes()
        .iter()
        .map(|route| format!("{} {}", route.method, route.path))
        .collect();

    let server = Server::builder()
        .router(registrar.into_router())
        .registry(registry)
        .build();
    (server, paths)
}

async fn call(server: &Server, req: Request<Full<Bytes>>) -> (StatusCode, String) {
    let response = server.handle(req).await;
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_every_route_registers() {
    let (_, paths) = server();
    assert_eq!(
        paths,
        [
            "GET /hello/abc",
            "GET /hello/string",
            "GET /hello/uint64",
            "GET /hello/hello-way",
            "GET /demo/abc",
            "POST /demo/test_post",
            "PUT /demo/1put",
            "DELETE /demo/delete",
            "GET /demo/ws",
            "GET /ws",
            "GET /me",
        ]
    );
}

#[tokio::test]
async fn test_hello_abc_uses_query_defaults() {
    let (server, _) = server();
    let (status, body) = call(&server, request(Method::GET, "/hello/abc?type=join&arg3=xyz", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({
            "code": 0,
            "message": "",
            "data": { "arg1": { "haha": 1 }, "arg3": { "haha": 3 }, "join": { "haha": 1 } }
        })
    );
}

#[tokio::test]
async fn test_hello_abc_rejects_bad_query() {
    let (server, _) = server();
    let (status, _) = call(&server, request(Method::GET, "/hello/abc?arg1=maybe", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_text_and_json_media() {
    let (server, _) = server();

    let (status, body) = call(&server, request(Method::GET, "/hello/string", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello daedalus");

    let (_, body) = call(&server, request(Method::GET, "/hello/uint64", "")).await;
    assert_eq!(body, u64::MAX.to_string());

    let (_, body) = call(&server, request(Method::GET, "/hello/hello-way?arg1=QWE", "")).await;
    assert_eq!(json_body(&body)["data"], "hello the qwe way");
}

#[tokio::test]
async fn test_demo_abc() {
    let (server, _) = server();
    let (_, body) = call(&server, request(Method::GET, "/demo/abc", "")).await;
    let body = json_body(&body);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["efg"], json!([1, 2, 3]));
    assert_eq!(body["data"]["hijk"]["h"], "ijk");
}

#[tokio::test]
async fn test_post_runs_audit_before_handler() {
    let (server, _) = server();
    let (status, body) = call(
        &server,
        request(Method::POST, "/demo/test_post", r#"{"req1":"a"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["data"]["list"], json!(["a", "2333", "/demo/test_post"]));
}

#[tokio::test]
async fn test_put_inherits_default_spec() {
    let (server, _) = server();
    let (status, body) = call(
        &server,
        request(Method::PUT, "/demo/1put?id=7", r#"{"name":"seven"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({ "code": 0, "message": "", "data": { "id": 7, "name": "seven" } })
    );
}

#[tokio::test]
async fn test_delete() {
    let (server, _) = server();
    let (status, body) = call(&server, request(Method::DELETE, "/demo/delete?id=3", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "deleted 3");
}

#[tokio::test]
async fn test_ws_requires_api_key() {
    let (server, _) = server();
    let (status, body) = call(&server, request(Method::GET, "/ws", "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["error"]["code"], "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn test_me_reads_jwt_subject() {
    let (server, _) = server();
    let claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"ada"}"#);
    let req = Request::builder()
        .uri("/me")
        .header("authorization", format!("Bearer e30.{claims}.sig"))
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (status, body) = call(&server, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["data"], json!({ "scheme": "jwt", "subject": "ada" }));

    let (status, _) = call(&server, request(Method::GET, "/me", "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_verb_is_405() {
    let (server, _) = server();
    let (status, _) = call(&server, request(Method::GET, "/demo/test_post", "")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

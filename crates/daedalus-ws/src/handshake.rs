//! RFC 6455 upgrade handshake over request headers.

use base64::Engine;
use daedalus_core::{Response, ResponseExt};
use http::{header, HeaderMap, StatusCode};
use sha1::{Digest, Sha1};

use crate::error::{WsError, WsResult};

/// The WebSocket magic GUID used in the handshake.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const SEC_KEY: &str = "sec-websocket-key";
const SEC_VERSION: &str = "sec-websocket-version";
const SEC_PROTOCOL: &str = "sec-websocket-protocol";
const SEC_ACCEPT: &str = "sec-websocket-accept";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn has_connection_upgrade(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONNECTION.as_str()).is_some_and(|v| {
        v.split(',')
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    })
}

fn has_upgrade_websocket(headers: &HeaderMap) -> bool {
    header_str(headers, header::UPGRADE.as_str()).is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn websocket_key(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, SEC_KEY).filter(|v| !v.is_empty())
}

fn has_version_13(headers: &HeaderMap) -> bool {
    header_str(headers, SEC_VERSION).is_some_and(|v| v.trim() == "13")
}

/// True if the headers describe a complete WebSocket upgrade request.
pub fn is_websocket_request(headers: &HeaderMap) -> bool {
    has_connection_upgrade(headers)
        && has_upgrade_websocket(headers)
        && websocket_key(headers).is_some()
        && has_version_13(headers)
}

/// Validates an upgrade request and returns the `Sec-WebSocket-Accept` value.
pub fn validate_upgrade(headers: &HeaderMap) -> WsResult<String> {
    if !has_connection_upgrade(headers) {
        return Err(WsError::not_websocket("missing Connection: Upgrade header"));
    }
    if !has_upgrade_websocket(headers) {
        return Err(WsError::not_websocket("missing Upgrade: websocket header"));
    }
    let key = websocket_key(headers)
        .ok_or_else(|| WsError::not_websocket("missing Sec-WebSocket-Key header"))?;
    if !has_version_13(headers) {
        return Err(WsError::not_websocket(
            "missing or invalid Sec-WebSocket-Version header (must be 13)",
        ));
    }
    Ok(compute_accept_key(key))
}

/// Computes the `Sec-WebSocket-Accept` value for a client key.
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Subprotocols offered by the client, in preference order.
pub fn requested_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SEC_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Picks the first client-offered subprotocol that `allowed` contains.
///
/// An empty `allowed` list never selects a protocol.
pub fn negotiate_protocol(headers: &HeaderMap, allowed: &[String]) -> Option<String> {
    requested_protocols(headers)
        .into_iter()
        .find(|p| allowed.iter().any(|a| a.eq_ignore_ascii_case(p)))
}

/// Builds the `101 Switching Protocols` response.
pub fn switching_protocols(accept_key: &str, protocol: Option<&str>) -> Response {
    let mut response = Response::empty(StatusCode::SWITCHING_PROTOCOLS);
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, header::HeaderValue::from_static("Upgrade"));
    headers.insert(header::UPGRADE, header::HeaderValue::from_static("websocket"));
    if let Ok(value) = header::HeaderValue::from_str(accept_key) {
        headers.insert(SEC_ACCEPT, value);
    }
    if let Some(value) = protocol.and_then(|p| header::HeaderValue::from_str(p).ok()) {
        headers.insert(SEC_PROTOCOL, value);
    }
    response
}

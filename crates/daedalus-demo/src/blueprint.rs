//! Demo routes.
//!
//! Two groups (`/hello`, `/demo`), a top-level WebSocket and a
//! JWT-protected `/me`. Each route spells out the stages it needs; `1put`
//! extends the registrar's default spec with `...`.

use std::collections::BTreeMap;

use daedalus::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::AUDIT_STATE;

/// A route that takes no arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoArgs {}

/// WebSocket message kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMsgType {
    /// Keepalive request.
    #[default]
    Ping,
    /// Keepalive answer.
    Pong,
    /// Join a room.
    Join,
    /// Leave a room.
    Leave,
    /// Client came to the foreground.
    Foreground,
    /// Client asks for a protocol upgrade.
    Upgrade,
}

impl WsMsgType {
    /// The wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Foreground => "foreground",
            Self::Upgrade => "upgrade",
        }
    }

    /// The kind sent in reply to this one.
    pub const fn reply(self) -> Self {
        match self {
            Self::Ping => Self::Pong,
            other => other,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_arg2() -> f64 {
    6.666
}

/// Query of `GET /hello/abc`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloAbc {
    /// Flag, defaults to `true`.
    #[serde(default = "default_true")]
    pub arg1: bool,
    /// Ratio, defaults to `6.666`.
    #[serde(default = "default_arg2")]
    pub arg2: f64,
    /// Optional label.
    #[serde(default)]
    pub arg3: Option<String>,
    /// Message kind.
    #[serde(default, rename = "type")]
    pub kind: WsMsgType,
}

/// One counter of the `/hello/abc` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Haha {
    /// Counter value.
    pub haha: i64,
}

/// Direction selector of `GET /hello/hello-way`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Way {
    /// The default way.
    #[default]
    Asd,
    /// The other way.
    Qwe,
}

/// Query of `GET /hello/hello-way`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelloWay {
    /// Way to greet.
    #[serde(default)]
    pub arg1: Way,
}

/// Reply of `GET /demo/abc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDemoA {
    /// Counter.
    pub a: i32,
    /// Label.
    pub bc: String,
    /// Series.
    pub efg: Vec<i64>,
    /// Attributes.
    pub hijk: BTreeMap<String, String>,
    /// Flag.
    pub lmnop: bool,
}

const fn default_req2() -> i64 {
    2333
}

/// Body of `POST /demo/test_post`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestPost {
    /// Required field.
    pub req1: String,
    /// Defaults to `2333`.
    #[serde(default = "default_req2")]
    pub req2: i64,
}

/// Reply of `POST /demo/test_post`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPostReply {
    /// Echoed fields followed by the audited path.
    pub list: Vec<String>,
}

/// Query of `PUT /demo/1put`.
#[derive(Debug, Clone, Deserialize)]
pub struct PutQuery {
    /// Record id.
    pub id: u64,
}

/// Body of `PUT /demo/1put`.
#[derive(Debug, Clone, Deserialize)]
pub struct PutBody {
    /// New record name.
    pub name: String,
}

/// Reply of `PUT /demo/1put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReply {
    /// Record id.
    pub id: u64,
    /// Stored name.
    pub name: String,
}

/// Query of `DELETE /demo/delete`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteQuery {
    /// Record id.
    pub id: u64,
}

/// A WebSocket frame in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsMessage {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: WsMsgType,
    /// Payload.
    #[serde(default)]
    pub data: Value,
}

/// Reply of `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Me {
    /// Scheme that accepted the token.
    pub scheme: String,
    /// Token subject.
    pub subject: Option<String>,
}

fn len_as_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn hello_abc(
    _ctx: &mut Context<HelloAbc, (), (), BTreeMap<String, Haha>>,
    req: Req<HelloAbc, (), ()>,
) -> BoxFuture<'_, Result<BTreeMap<String, Haha>, ApiError>> {
    Box::pin(async move {
        let args = req.query.ok_or_else(ApiError::unknown)?;
        if !args.arg2.is_finite() {
            return Err(ApiError::new("invalid_arg2", 10001, "arg2 must be finite"));
        }
        let mut counters = BTreeMap::new();
        counters.insert("arg1".to_string(), Haha { haha: i64::from(args.arg1) });
        counters.insert(
            "arg3".to_string(),
            Haha {
                haha: len_as_i64(args.arg3.as_deref().map_or(0, str::len)),
            },
        );
        counters.insert(args.kind.as_str().to_string(), Haha { haha: 1 });
        Ok(counters)
    })
}

fn demo_abc(
    _ctx: &mut Context<NoArgs, (), (), ApiDemoA>,
    _req: Req<NoArgs, (), ()>,
) -> BoxFuture<'_, Result<ApiDemoA, ApiError>> {
    Box::pin(async {
        Ok(ApiDemoA {
            a: 1,
            bc: "bc".to_string(),
            efg: vec![1, 2, 3],
            hijk: BTreeMap::from([("h".to_string(), "ijk".to_string())]),
            lmnop: true,
        })
    })
}

fn test_post(
    ctx: &mut Context<(), (), TestPost, TestPostReply>,
    req: Req<(), (), TestPost>,
) -> BoxFuture<'_, Result<TestPostReply, ApiError>> {
    Box::pin(async move {
        let body = req.json.ok_or_else(ApiError::unknown)?;
        let mut list = vec![body.req1, body.req2.to_string()];
        if let Some(path) = ctx.exchange().state::<String>(AUDIT_STATE) {
            list.push(path.clone());
        }
        Ok(TestPostReply { list })
    })
}

fn echo_frame(
    _ctx: &mut Context<NoArgs, (), WsMessage, WsMessage>,
    req: Req<NoArgs, (), WsMessage>,
) -> BoxFuture<'_, Result<WsMessage, ApiError>> {
    Box::pin(async move {
        let message = req.json.ok_or_else(ApiError::unknown)?;
        Ok(WsMessage {
            kind: message.kind.reply(),
            data: message.data,
        })
    })
}

/// Registers every demo route.
///
/// `/demo/test_post` needs the `audit` stage, see
/// [`register_providers`](crate::audit::register_providers).
pub fn register_routes(r: &mut Registrar) -> PipelineResult<()> {
    r.group("/hello", |r: &mut Registrar| -> PipelineResult<()> {
        r.get("/abc", hello_abc, "req=Q|handle|rsp=json@general")?;
        r.get(
            "/string",
            |_ctx: &mut Context<NoArgs, (), (), String>, _req: Req<NoArgs, (), ()>| {
                Box::pin(async { Ok("hello daedalus".to_string()) })
            },
            "req=Q|handle|rsp=text",
        )?;
        r.get(
            "/uint64",
            |_ctx: &mut Context<NoArgs, (), (), u64>, _req: Req<NoArgs, (), ()>| {
                Box::pin(async { Ok(u64::MAX) })
            },
            "req=Q|handle|rsp=json",
        )?;
        r.get(
            "/hello-way",
            |_ctx: &mut Context<HelloWay, (), (), String>, req: Req<HelloWay, (), ()>| {
                Box::pin(async move {
                    let way = req.query.unwrap_or_default().arg1;
                    Ok(match way {
                        Way::Asd => "hello the asd way".to_string(),
                        Way::Qwe => "hello the qwe way".to_string(),
                    })
                })
            },
            "req=Q|handle|rsp=json@general",
        )?;
        Ok(())
    })?;

    r.group("/demo", |r: &mut Registrar| -> PipelineResult<()> {
        r.get("/abc", demo_abc, "req=Q|handle|rsp=json@general")?;
        r.post("/test_post", test_post, "req=J|audit|handle|rsp=json@general")?;
        r.put(
            "/1put",
            |_ctx: &mut Context<PutQuery, (), PutBody, PutReply>, req: Req<PutQuery, (), PutBody>| {
                Box::pin(async move {
                    let (Some(query), Some(body)) = (req.query, req.json) else {
                        return Err(ApiError::unknown());
                    };
                    Ok(PutReply {
                        id: query.id,
                        name: body.name,
                    })
                })
            },
            "...|rsp=json@general",
        )?;
        r.delete(
            "/delete",
            |_ctx: &mut Context<DeleteQuery, (), (), String>, req: Req<DeleteQuery, (), ()>| {
                Box::pin(async move {
                    let query = req.query.ok_or_else(ApiError::unknown)?;
                    Ok(format!("deleted {}", query.id))
                })
            },
            "req=Q|handle|rsp=text",
        )?;
        r.ws("/ws", echo_frame, "req=J|ws_handle|rsp=json")?;
        Ok(())
    })?;

    r.ws("/ws", echo_frame, "req=QJ|auth=api_key|ws_handle|rsp=json@general")?;
    r.get(
        "/me",
        |ctx: &mut Context<NoArgs, (), (), Me>, _req: Req<NoArgs, (), ()>| {
            Box::pin(async move {
                let auth = ctx.auth().ok_or_else(ApiError::token_expired)?;
                Ok(Me {
                    scheme: auth.scheme.clone(),
                    subject: auth.subject.clone(),
                })
            })
        },
        "req=Q|auth=jwt|handle|rsp=json@general",
    )?;
    Ok(())
}

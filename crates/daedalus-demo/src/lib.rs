//! Daedalus Demo - Example blueprint server
//!
//! Routes live in [`blueprint`]; the `audit` stage in [`audit`] shows how a
//! registry-provided stage is plugged into spec strings.
//!
//! ```text
//! GET    /hello/abc         req=Q|handle|rsp=json@general
//! GET    /hello/string      req=Q|handle|rsp=text
//! GET    /hello/uint64      req=Q|handle|rsp=json
//! GET    /hello/hello-way   req=Q|handle|rsp=json@general
//! GET    /demo/abc          req=Q|handle|rsp=json@general
//! POST   /demo/test_post    req=J|audit|handle|rsp=json@general
//! PUT    /demo/1put         ...|rsp=json@general
//! DELETE /demo/delete       req=Q|handle|rsp=text
//! WS     /demo/ws           req=J|ws_handle|rsp=json
//! WS     /ws                req=QJ|auth=api_key|ws_handle|rsp=json@general
//! GET    /me                req=Q|auth=jwt|handle|rsp=json@general
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! # Run with a configuration file
//! $ daedalus-demo --config /etc/daedalus/demo.toml
//!
//! # Run with environment variable overrides
//! $ DAEDALUS_SERVER_HTTP_ADDR=127.0.0.1:3000 DAEDALUS_LOG_FORMAT=pretty daedalus-demo
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-demo/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod blueprint;

/// Demo version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

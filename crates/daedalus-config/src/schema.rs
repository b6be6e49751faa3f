//! Configuration section types.

use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// ```
/// use daedalus_config::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.request_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Per-request timeout in seconds, covering body collection and the chain.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Pipeline configuration section.
///
/// Feeds the route registrar: the base spec, the resolution mode and the
/// decoder's body limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Spec used for routes registered with an empty spec and as the base
    /// for `...` inheritance.
    #[serde(default = "default_spec")]
    pub default_spec: String,

    /// Reject unresolved spec tokens at registration instead of dropping them.
    #[serde(default = "default_true")]
    pub strict_resolution: bool,

    /// Maximum form/JSON body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_spec: default_spec(),
            strict_resolution: true,
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_spec() -> String {
    "req=QJ|handle|rsp=json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

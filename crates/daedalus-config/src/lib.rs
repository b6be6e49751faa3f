//! Typed configuration for Daedalus servers.
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! `DAEDALUS_*` environment variables (optionally seeded from `.env`).
//! Unknown fields are rejected at every level.
//!
//! # Example
//!
//! ```no_run
//! use daedalus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), daedalus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("daedalus.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("DAEDALUS")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! request_timeout_secs = 30
//! shutdown_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [pipeline]
//! default_spec = "req=QJ|handle|rsp=json"
//! strict_resolution = true
//! max_body_size = 1048576
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DAEDALUS_SERVER_HTTP_ADDR` | `server.http_addr` |
//! | `DAEDALUS_SERVER_REQUEST_TIMEOUT_SECS` | `server.request_timeout_secs` |
//! | `DAEDALUS_SERVER_SHUTDOWN_TIMEOUT_SECS` | `server.shutdown_timeout_secs` |
//! | `DAEDALUS_LOG_LEVEL` | `logging.level` |
//! | `DAEDALUS_LOG_FORMAT` | `logging.format` |
//! | `DAEDALUS_PIPELINE_STRICT` | `pipeline.strict_resolution` |
//! | `DAEDALUS_PIPELINE_DEFAULT_SPEC` | `pipeline.default_spec` |
//! | `DAEDALUS_PIPELINE_MAX_BODY_SIZE` | `pipeline.max_body_size` |

#![doc(html_root_url = "https://docs.rs/daedalus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::DaedalusConfig;
pub use daedalus_telemetry::{LogConfig, LogFormat};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{PipelineConfig, ServerConfig};

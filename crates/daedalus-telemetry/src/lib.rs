//! Structured logging for Daedalus.
//!
//! Pipelines log through the `tracing` macros; this crate installs the
//! subscriber that turns those events into output. The binary calls
//! [`init_logging`] once at startup with the [`LogConfig`] section of its
//! configuration.
//!
//! | Format | Layer | Intended for |
//! |--------|-------|--------------|
//! | [`LogFormat::Json`] | `fmt::layer().json()` | production, log shippers |
//! | [`LogFormat::Pretty`] | `fmt::layer().pretty()` | local development |
//! | [`LogFormat::Compact`] | `fmt::layer().compact()` | terminals, CI logs |
//!
//! # Example
//!
//! ```rust,no_run
//! use daedalus_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).unwrap();
//! tracing::info!(route = "/hello/:id", "registered");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

//! Errors raised while installing the log subscriber.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    LoggingInit(String),

    /// A `[logging]` value was rejected.
    #[error("invalid logging setting: {0}")]
    InvalidConfig(String),
}

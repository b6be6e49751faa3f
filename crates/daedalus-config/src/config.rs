//! Root configuration type.

use serde::{Deserialize, Serialize};

use daedalus_telemetry::LogConfig;

use crate::{ConfigError, PipelineConfig, ServerConfig};

/// Complete Daedalus configuration.
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LogConfig,

    /// Pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl DaedalusConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the server address is not a socket address
    /// - a timeout or the body limit is zero
    /// - the default spec is empty or itself uses `...`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.pipeline.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "pipeline.max_body_size",
                "must be greater than zero",
            ));
        }

        let tokens: Vec<&str> = self
            .pipeline
            .default_spec
            .split('|')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline.default_spec",
                "must name at least one stage",
            ));
        }
        if tokens.contains(&"...") {
            return Err(ConfigError::invalid_value(
                "pipeline.default_spec",
                "the base spec cannot inherit with '...'",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logging, lenient resolution.
    ///
    /// ```
    /// use daedalus_config::DaedalusConfig;
    ///
    /// let config = DaedalusConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(!config.pipeline.strict_resolution);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::development();
        config.pipeline.strict_resolution = false;
        config
    }

    /// Production preset: JSON info logging, strict resolution.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::production();
        config.pipeline.strict_resolution = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DaedalusConfig::default().validate().is_ok());
        assert!(DaedalusConfig::development().validate().is_ok());
        assert!(DaedalusConfig::production().validate().is_ok());
    }

    #[test]
    fn test_invalid_addr() {
        let mut config = DaedalusConfig::default();
        config.server.http_addr = "localhost".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "server.http_addr"));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = DaedalusConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_body_limit() {
        let mut config = DaedalusConfig::default();
        config.pipeline.max_body_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_spec_rules() {
        let mut config = DaedalusConfig::default();
        config.pipeline.default_spec = " | ".to_string();
        assert!(config.validate().is_err());

        config.pipeline.default_spec = "req=Q|...".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.default_spec"));

        config.pipeline.default_spec = "req=QJ|auth=jwt|handle|rsp=json@general".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_differ() {
        assert_ne!(DaedalusConfig::development(), DaedalusConfig::production());
    }
}

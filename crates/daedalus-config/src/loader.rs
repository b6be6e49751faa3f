//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use daedalus_telemetry::LogFormat;

use crate::{ConfigError, DaedalusConfig};

/// Builder that layers defaults, a TOML file and environment overrides.
///
/// ```
/// use daedalus_config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_str("[pipeline]\nstrict_resolution = false\n")
///     .unwrap()
///     .load()
///     .unwrap();
///
/// assert!(!config.pipeline.strict_resolution);
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: DaedalusConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DaedalusConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DaedalusConfig::production();
        self
    }

    /// Loads a TOML file, which must exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable or invalid.
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.with_str(&content)
    }

    /// Loads a TOML file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads TOML from a string.
    ///
    /// Sections absent from the document take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TomlError` on syntax errors or unknown fields.
    pub fn with_str(mut self, content: &str) -> Result<Self, ConfigError> {
        self.config = toml::from_str(content)?;
        Ok(self)
    }

    /// Loads `.env` from the current directory into the process environment.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Enables environment overrides of the form `PREFIX_SECTION_KEY`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation fails.
    pub fn load(mut self) -> Result<DaedalusConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> DaedalusConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(name) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix('_'))
        else {
            return Ok(());
        };

        match name {
            "SERVER_HTTP_ADDR" => {
                self.config.server.http_addr = value.to_string();
            }
            "SERVER_REQUEST_TIMEOUT_SECS" => {
                self.config.server.request_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "SERVER_SHUTDOWN_TIMEOUT_SECS" => {
                self.config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "LOG_LEVEL" => {
                self.config.logging.level = value.to_string();
            }
            "LOG_FORMAT" => {
                self.config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))?;
            }
            "PIPELINE_STRICT" => {
                self.config.pipeline.strict_resolution = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "PIPELINE_DEFAULT_SPEC" => {
                self.config.pipeline.default_spec = value.to_string();
            }
            "PIPELINE_MAX_BODY_SIZE" => {
                self.config.pipeline.max_body_size = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            _ => {}
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, DaedalusConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [server]
            http_addr = "127.0.0.1:3000"

            [logging]
            format = "compact"

            [pipeline]
            default_spec = "req=Q|auth=jwt|handle|rsp=json@general"
            "#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(
            config.pipeline.default_spec,
            "req=Q|auth=jwt|handle|rsp=json@general"
        );
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[telemetry]\nservice_name = \"x\"").unwrap();

        let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_loader_file_not_found() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/daedalus.toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_loader_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/daedalus.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_validates() {
        let err = ConfigLoader::new()
            .with_str("[server]\nhttp_addr = \"nowhere\"")
            .unwrap()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_unvalidated() {
        let config = ConfigLoader::new()
            .with_str("[server]\nhttp_addr = \"nowhere\"")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.server.http_addr, "nowhere");
    }

    #[test]
    fn test_apply_env_var_server() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST_SERVER_HTTP_ADDR", "192.168.1.1:9000", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST_SERVER_REQUEST_TIMEOUT_SECS", "5", "TEST")
            .unwrap();
        assert_eq!(loader.config.server.http_addr, "192.168.1.1:9000");
        assert_eq!(loader.config.server.request_timeout_secs, 5);
    }

    #[test]
    fn test_apply_env_var_logging() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST_LOG_LEVEL", "debug", "TEST").unwrap();
        loader.apply_env_var("TEST_LOG_FORMAT", "Pretty", "TEST").unwrap();
        assert_eq!(loader.config.logging.level, "debug");
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);

        let err = loader
            .apply_env_var("TEST_LOG_FORMAT", "xml", "TEST")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));
    }

    #[test]
    fn test_apply_env_var_pipeline() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST_PIPELINE_STRICT", "off", "TEST").unwrap();
        loader
            .apply_env_var("TEST_PIPELINE_DEFAULT_SPEC", "req=J|handle|rsp=text", "TEST")
            .unwrap();
        assert!(!loader.config.pipeline.strict_resolution);
        assert_eq!(loader.config.pipeline.default_spec, "req=J|handle|rsp=text");

        assert!(loader
            .apply_env_var("TEST_PIPELINE_STRICT", "maybe", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST_PIPELINE_MAX_BODY_SIZE", "big", "TEST")
            .is_err());
    }

    #[test]
    fn test_apply_env_var_ignores_unknown() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST_SOMETHING_ELSE", "1", "TEST").unwrap();
        loader.apply_env_var("TESTING", "1", "TEST").unwrap();
        assert_eq!(loader.config, DaedalusConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), None);
    }
}

//! Gateway configuration.
//!
//! Layers, lowest first: built-in defaults, a TOML file, `BAPS_*` environment
//! variables, then command-line flags (applied by the binary).
//!
//! ```toml
//! [server]
//! host = "studio.example"
//! port = 1350
//!
//! [auth]
//! username = "studio1"
//! password = "secret"
//!
//! [logging]
//! level = "debug"
//!
//! [output]
//! json = true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::transport::DEFAULT_PORT;
use crate::writer::{WriterConfig, DEFAULT_CHANNEL_CAPACITY};

pub const ENV_HOST: &str = "BAPS_HOST";
pub const ENV_PORT: &str = "BAPS_PORT";
pub const ENV_USERNAME: &str = "BAPS_USERNAME";
pub const ENV_PASSWORD: &str = "BAPS_PASSWORD";
pub const ENV_LOG: &str = "BAPS_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Outbound queue capacity.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Write synchronised responses to stdout as JSON lines.
    pub json: bool,
}

impl GatewayConfig {
    /// Parse a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| GatewayError::Config(format!("failed to parse config: {e}")))
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| GatewayError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `BAPS_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup.
    ///
    /// Blank values are ignored. An unparsable port is logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(host) = get(ENV_HOST) {
            self.server.host = host;
        }

        if let Some(raw) = get(ENV_PORT) {
            match raw.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(err) => tracing::warn!("invalid {ENV_PORT}, ignoring: {err}"),
            }
        }

        if let Some(username) = get(ENV_USERNAME) {
            self.auth.username = username;
        }

        if let Some(password) = get(ENV_PASSWORD) {
            self.auth.password = password;
        }

        if let Some(level) = get(ENV_LOG) {
            self.logging.level = level;
        }
    }

    /// Writer settings derived from this config.
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            channel_capacity: self.server.queue_capacity.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();

        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.logging.level, "info");
        assert!(!config.output.json);
        assert!(config.auth.username.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GatewayConfig::from_toml(
            r#"
            [server]
            host = "studio.example"

            [auth]
            username = "studio1"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "studio.example");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.auth.username, "studio1");
        assert_eq!(config.auth.password, "");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        let result = GatewayConfig::from_toml("[server\nport = ");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = GatewayConfig::from_file(Path::new("/nonexistent/baps-gateway.toml"));
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();

        config.apply_overrides_from(env(&[
            (ENV_HOST, "10.0.0.5"),
            (ENV_PORT, "1351"),
            (ENV_USERNAME, "studio2"),
            (ENV_PASSWORD, "hunter2"),
            (ENV_LOG, "debug"),
        ]));

        assert_eq!(config.server.host, "10.0.0.5");
        assert_eq!(config.server.port, 1351);
        assert_eq!(config.auth.username, "studio2");
        assert_eq!(config.auth.password, "hunter2");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_or_blank_env_ignored() {
        let mut config = GatewayConfig::default();

        config.apply_overrides_from(env(&[(ENV_PORT, "not-a-port"), (ENV_HOST, "   ")]));

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = GatewayConfig::default();
        config.output.json = true;
        config.server.queue_capacity = 8;

        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed = GatewayConfig::from_toml(&rendered).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.writer_config().channel_capacity, 8);
    }
}

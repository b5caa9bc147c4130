//! Configuration types.
//!
//! Configuration is read from `<config_dir>/spotter/ml.toml`. Every field has
//! a default, so a missing file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Endpoint the host listens on.
pub const DEFAULT_ENDPOINT: &str = "ws://0.0.0.0:4040";

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV_VAR: &str = "SPOTTER_ENDPOINT";

/// Runtime configuration for a plugin process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpotterConfig {
    /// Host WebSocket URL.
    pub endpoint: String,

    /// Bound on the connect attempt.
    pub connect_timeout_ms: u64,

    /// Bound on a suspended option callback. `0` waits forever.
    pub handler_timeout_ms: u64,

    /// Number of result generations per context whose handler ids stay
    /// resolvable. At least 1.
    pub retained_generations: usize,

    /// History settings for the ML plugin.
    pub history: HistoryConfig,
}

impl Default for SpotterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_ms: 5_000,
            handler_timeout_ms: 30_000,
            retained_generations: 2,
            history: HistoryConfig::default(),
        }
    }
}

impl SpotterConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&source)
    }

    /// Load the config file if it exists, then apply the environment override.
    ///
    /// Returns defaults when there is no config directory or no file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_path().as_deref(), std::env::var(ENDPOINT_ENV_VAR).ok())
    }

    /// Load `path` if it exists, apply `endpoint_override` and validate the
    /// result.
    pub fn load_from(
        path: Option<&Path>,
        endpoint_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env_override(endpoint_override);
        config.validate()?;
        Ok(config)
    }

    /// Replace the endpoint with `value` when it is set and non-empty.
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(endpoint) = value.filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint;
        }
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retained_generations == 0 {
            return Err(ConfigError::Invalid(
                "retained_generations must be at least 1".to_string(),
            ));
        }
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint '{}' is not a ws:// or wss:// URL",
                self.endpoint
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Handler timeout, or `None` when callbacks may suspend forever.
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_ms > 0).then(|| Duration::from_millis(self.handler_timeout_ms))
    }
}

/// Settings for the action-path history kept by the ML plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Location of the JSON store. Defaults to `<data_dir>/spotter/db.json`.
    pub path: Option<PathBuf>,

    /// Number of active window titles kept in memory.
    pub window_limit: usize,

    /// How often the active window is sampled.
    pub poll_interval_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            window_limit: 50,
            poll_interval_ms: 1_000,
        }
    }
}

impl HistoryConfig {
    /// The configured store path, falling back to the data directory and
    /// finally to `db.json` in the working directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("db.json")))
            .unwrap_or_else(|| PathBuf::from("db.json"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("spotter"))
}

/// Get the path to the config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("ml.toml"))
}

/// Get the data directory path.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("spotter"))
}

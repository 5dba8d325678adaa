//! Configuration management.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use crate::error::ComputeError;
use crate::stats::StatsWindow;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PulseConfig {
    /// Event collector configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Aggregation configuration
    #[serde(default)]
    pub stats: StatsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PulseConfig {
    /// Parse a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self, ComputeError> {
        toml::from_str(toml).map_err(|e| ComputeError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ComputeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Ingestion endpoint batches are posted to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Queue length that triggers an immediate flush
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// Debounce interval before a scheduled flush, in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Storage key holding the session token
    #[serde(default = "default_session_key")]
    pub session_key: String,

    /// Storage key holding the session start timestamp
    #[serde(default = "default_session_start_key")]
    pub session_start_key: String,
}

impl CollectorConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            flush_threshold: default_flush_threshold(),
            flush_interval_ms: default_flush_interval_ms(),
            session_key: default_session_key(),
            session_start_key: default_session_start_key(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsConfig {
    /// Window used when a request does not name one (7, 14 or 30)
    #[serde(default)]
    pub default_window_days: StatsWindow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an EnvFilter string)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for terminals
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

fn default_endpoint() -> String {
    "/api/analytics/events".to_string()
}

fn default_flush_threshold() -> usize {
    5
}

fn default_flush_interval_ms() -> u64 {
    5_000
}

fn default_session_key() -> String {
    "pulse_session_id".to_string()
}

fn default_session_start_key() -> String {
    "pulse_session_start".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PulseConfig::from_toml_str("").unwrap();
        assert_eq!(config.collector.flush_threshold, 5);
        assert_eq!(config.collector.flush_interval(), Duration::from_millis(5000));
        assert_eq!(config.collector.endpoint, "/api/analytics/events");
        assert_eq!(config.stats.default_window_days, StatsWindow::Week);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_config() {
        let config = PulseConfig::from_toml_str(
            r#"
            [collector]
            endpoint = "https://example.com/ingest"
            flush_threshold = 10

            [stats]
            default_window_days = 30

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.collector.endpoint, "https://example.com/ingest");
        assert_eq!(config.collector.flush_threshold, 10);
        assert_eq!(config.collector.flush_interval_ms, 5000);
        assert_eq!(config.stats.default_window_days, StatsWindow::Month);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let result = PulseConfig::from_toml_str("[stats]\ndefault_window_days = 9\n");
        assert!(matches!(result, Err(ComputeError::Config(_))));
    }
}

//! Structured logging setup for the `pulse` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the host. `RUST_LOG` takes precedence over the configured level. Logs go to
//! stderr so command output on stdout stays machine-readable.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ComputeError;
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber described by `config`
pub fn init_logging(config: &LoggingConfig) -> Result<(), ComputeError> {
    let filter = build_filter(config)?;

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| ComputeError::Config(e.to_string()))
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| ComputeError::Config(e.to_string()))
        }
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ComputeError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ComputeError::Config(format!("invalid log level '{}': {}", config.level, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "spread_pulse=loud".to_string(),
            format: LogFormat::Pretty,
        };
        assert!(matches!(build_filter(&config), Err(ComputeError::Config(_))));
    }

    #[test]
    fn test_default_level_parses() {
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }
}

//! Observability infrastructure.
//!
//! Structured logging via the tracing ecosystem. Certificate operations log
//! subjects, authority identifiers, paths, and backend identities, never
//! key material or tokens (see
//! [`SecretString`](crate::secrets::SecretString)).

use tracing_subscriber::EnvFilter;

use crate::errors::{Error, Result};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_format: false }
    }
}

impl LoggingConfig {
    /// Load from `TRUSTPLANE_LOG_LEVEL` and `TRUSTPLANE_LOG_FORMAT`
    /// (`json` enables JSON output).
    pub fn from_env() -> Self {
        let log_level =
            std::env::var("TRUSTPLANE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json_format = std::env::var("TRUSTPLANE_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        Self { log_level, json_format }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured default level. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))
}

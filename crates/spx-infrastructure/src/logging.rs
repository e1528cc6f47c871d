//! Structured logging with tracing
//!
//! Configures the tracing subscriber from the logging section of the stack
//! configuration. Every resolver, instantiator, and lifecycle diagnostic
//! flows through tracing with capability/kind/instance fields attached.

use spx_domain::error::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

pub use crate::config::LoggingConfig;

/// Initialize logging with the provided configuration.
///
/// The `SPX_LOG` environment variable overrides the configured level
/// filter. Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    validate_level(&config.level)?;
    let filter =
        EnvFilter::try_from_env("SPX_LOG").unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = Registry::default().with(filter);
    let result = if config.json_format {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    result.map_err(|e| Error::config(format!("failed to initialize logging: {e}")))
}

fn validate_level(level: &str) -> Result<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "warning" | "error" => Ok(()),
        other => Err(Error::config(format!(
            "invalid log level '{other}' (expected trace, debug, info, warn, or error)"
        ))),
    }
}

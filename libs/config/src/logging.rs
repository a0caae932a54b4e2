//! Tracing subscriber bootstrap
//!
//! Library crates only emit `tracing` events. Binaries and test harnesses
//! call [`init_tracing`] once to install a subscriber.

use crate::engine_config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` when set, otherwise the configured level directive
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid logging.level directive {:?}", config.level)),
    }
}

/// Install the global subscriber; fails if one is already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);
    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    installed.context("Failed to install tracing subscriber")?;

    tracing::info!(level = %config.level, json = config.json, "Tracing initialized");
    Ok(())
}

//! # cpswap Configuration
//!
//! Engine configuration loading and logging bootstrap shared by every
//! process embedding the settlement core.
//!
//! ## Features
//!
//! - **Engine Configuration**: TOML file plus `CPSWAP_` environment overrides
//! - **Fee Tiers**: `[[amm_configs]]` tables validated on load
//! - **Logging**: `tracing-subscriber` setup with JSON or human-readable output
//!
//! ## Usage
//!
//! ```no_run
//! use cpswap_config::{init_tracing, EngineConfig};
//!
//! let config = EngineConfig::load("config/cpswap.toml")?;
//! init_tracing(&config.logging)?;
//! let manager = config.build_manager()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod engine_config;
pub mod logging;

pub use engine_config::{
    load_config, EngineConfig, LoggingConfig, OracleConfig, DEFAULT_CONFIG_PATH, ENV_PREFIX,
};
pub use logging::{env_filter, init_tracing};

//! Engine Configuration Module
//!
//! Loads the settlement engine configuration from a TOML file with
//! `CPSWAP_` environment overrides, with `__` separating nested keys
//! (`CPSWAP_LOGGING__LEVEL=debug`).

use anyhow::{ensure, Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use cpswap_amm::AmmConfig;
use cpswap_state::{PoolStateManager, OBSERVATION_NUM};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CPSWAP";

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/cpswap.toml";

/// Complete engine configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    /// Fee tiers registered at startup
    #[serde(default)]
    pub amm_configs: Vec<AmmConfig>,
}

/// Log output settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Price oracle settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Observation slots kept per pool
    pub capacity: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            capacity: OBSERVATION_NUM,
        }
    }
}

impl EngineConfig {
    /// Load from `path` (shell-expanded) with environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_path(path.as_ref())?;
        info!("Loading engine config: {:?}", path);

        let config = Config::builder()
            .add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        let engine: Self = config
            .try_deserialize()
            .context("Failed to deserialize engine configuration")?;
        engine.validate()?;
        Ok(engine)
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let engine: Self = toml::from_str(content).context("Failed to parse engine configuration")?;
        engine.validate()?;
        Ok(engine)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize engine configuration")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.logging.level.trim().is_empty(), "logging.level must not be empty");
        ensure!(self.oracle.capacity > 0, "oracle.capacity must be at least 1");

        let mut seen = HashSet::new();
        for amm_config in &self.amm_configs {
            ensure!(
                seen.insert(amm_config.index),
                "duplicate amm_configs index {}",
                amm_config.index
            );
            amm_config
                .validate()
                .with_context(|| format!("Invalid amm_configs entry {}", amm_config.index))?;
        }
        debug!(configs = self.amm_configs.len(), "Engine configuration validated");
        Ok(())
    }

    /// Registry with the configured oracle capacity and every fee tier
    pub fn build_manager(&self) -> Result<PoolStateManager> {
        let manager = PoolStateManager::with_observation_capacity(self.oracle.capacity);
        for amm_config in &self.amm_configs {
            manager
                .register_config(*amm_config)
                .with_context(|| format!("Failed to register amm config {}", amm_config.index))?;
        }
        info!(
            configs = self.amm_configs.len(),
            oracle_capacity = self.oracle.capacity,
            "Pool state manager ready"
        );
        Ok(manager)
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path
        .to_str()
        .with_context(|| format!("Config path is not valid UTF-8: {:?}", path))?;
    let expanded = shellexpand::full(raw).context("Failed to expand config path")?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Load from [`DEFAULT_CONFIG_PATH`]
pub fn load_config() -> Result<EngineConfig> {
    EngineConfig::load(DEFAULT_CONFIG_PATH)
}

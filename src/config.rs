//! Toolchain configuration module.
//!
//! Handles loading and validating `ofd.toml`. Configuration is layered:
//! stock defaults are overridden by the config file, which is in turn
//! overridden by command-line flags.
//!
//! ## Config File Location
//!
//! `ofd.toml` is read from the working directory, or from the path given
//! with `--config`. A missing default file is not an error.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! data_dir = "data"         # Brand/material/filament/variant tree
//! stores_dir = "stores"     # Store tree
//! schemas_dir = "schemas"   # JSON Schema files
//! output_dir = "dist"       # Export target for `ofd build`
//! log_level = "warn"        # error, warn, info, debug or trace
//!
//! [validation]
//! max_workers = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse. Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "ofd.toml";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Toolchain configuration loaded from `ofd.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OfdConfig {
    pub data_dir: PathBuf,
    pub stores_dir: PathBuf,
    pub schemas_dir: PathBuf,
    /// Root of everything `ofd build` writes.
    pub output_dir: PathBuf,
    /// Default tracing level when `RUST_LOG` is unset.
    pub log_level: String,
    pub validation: ValidationConfig,
}

impl Default for OfdConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            stores_dir: PathBuf::from("stores"),
            schemas_dir: PathBuf::from("schemas"),
            output_dir: PathBuf::from("dist"),
            log_level: "warn".to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl OfdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "log_level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if self.validation.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "validation.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Validation worker pool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Maximum number of parallel validation workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never below 1
pub fn effective_workers(config: &ValidationConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.min(cores))
        .unwrap_or(cores)
        .max(1)
}

// =============================================================================
// Config loading
// =============================================================================

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<OfdConfig, ConfigError> {
    let config: OfdConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or `./ofd.toml` when no path is given.
///
/// An explicit path must exist. A missing default file yields the stock
/// defaults.
pub fn load_config(path: Option<&Path>) -> Result<OfdConfig, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILE);
            if !default.exists() {
                return Ok(OfdConfig::default());
            }
            default
        }
    };
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `ofd.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r#"# Open Filament Database toolchain configuration
# ===============================================
#
# Place this file as ofd.toml in the repository root, or point to it with
# --config. Every key is optional; command-line flags win over this file.

# Brand/material/filament/variant tree.
data_dir = "data"

# One directory per store.
stores_dir = "stores"

# JSON Schema files (<name>_schema.json).
schemas_dir = "schemas"

# Export target for `ofd build`.
output_dir = "dist"

# Log level used when RUST_LOG is unset: error, warn, info, debug, trace.
log_level = "warn"

[validation]
# Maximum parallel validation workers. Omit for one per CPU core.
# Values above the core count are clamped down.
# max_workers = 4
"#
}

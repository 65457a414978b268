// src/config/mod.rs
//! TOML configuration for the scanning engine
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Loading always validates: the algorithm must be registered and a custom
//! filter table must be sound for every target it can select.

/// [`Config`] fields, defaults and validation
pub mod config;

pub use config::Config;

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Reads and validates a TOML file
///
/// # Errors
/// `ConfigError` when the file is unreadable, malformed or invalid
pub fn load(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    Config::load(path)
}

/// Loads a configuration file if it exists, defaults otherwise
pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    let path = path.into();
    if path.exists() {
        Config::load(path)
    } else {
        log::info!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Commented TOML template with every default spelled out
///
/// With `with_filter` the six-bucket coarse table is written out as
/// `[[filter]]` entries ready to edit; without it the built-in nine-bucket
/// table applies.
pub fn generate_template(with_filter: bool) -> String {
    Config::generate_template(with_filter)
}

//! Engine settings.
//!
//! Settings live in a small TOML file (`engine.toml` in the data directory).
//! Every field has a default, so a partial file is fine and a missing or
//! broken one falls back to the built-in values.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable engine behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of screen entries and relay dispatches started from actions.
    pub max_hops: usize,
    pub texts: TextConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hops: 64,
            texts: TextConfig::default(),
        }
    }
}

/// Player-facing status strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Shown instead of an inventory listing when nothing is held.
    pub empty_inventory: String,
    /// Prefix of the message set after a successful craft.
    pub crafted: String,
    /// Label in front of a recipe's ingredient list.
    pub needs: String,
    pub craftable: String,
    pub missing: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            empty_inventory: "Empty".to_string(),
            crafted: "You crafted".to_string(),
            needs: "needs".to_string(),
            craftable: "can craft".to_string(),
            missing: "missing ingredients".to_string(),
        }
    }
}

/// Loads engine settings from a TOML file, falling back to defaults on error.
///
/// # Logging
/// - `info!` on successful load
/// - `warn!` if the file cannot be read or parsed
pub fn load_config(toml_path: &Path) -> EngineConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!(
                "engine config loaded from '{}' (max_hops = {})",
                toml_path.display(),
                config.max_hops
            );
            config
        },
        Err(e) => {
            warn!(
                "Could not load engine config from '{}': {:#}. Using defaults.",
                toml_path.display(),
                e
            );
            EngineConfig::default()
        },
    }
}

/// Attempts to load engine settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn try_load_config(toml_path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(toml_path)
        .with_context(|| format!("reading engine config from '{}'", toml_path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing engine config from '{}'", toml_path.display()))
}

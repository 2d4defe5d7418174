//! Configuration management
//!
//! Handles storing and loading CLI configuration.
//! Config directory: ~/.gaia/ (cross-platform)
//!
//! Config file format (~/.gaia/config.toml):
//! ```toml
//! [hub]
//! url = "https://hub.blockstack.org"
//!
//! [identity]
//! app_private_key = "..."
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Structure of ~/.gaia/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GaiaCliConfig {
    /// Hub settings
    #[serde(default)]
    pub hub: HubSettings,

    /// Identity settings
    #[serde(default)]
    pub identity: IdentitySettings,
}

/// Hub connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Gaia hub base URL
    #[serde(default = "default_hub_url")]
    pub url: String,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            url: default_hub_url(),
        }
    }
}

fn default_hub_url() -> String {
    std::env::var("GAIA_HUB_URL").unwrap_or_else(|_| "https://hub.blockstack.org".to_string())
}

/// Identity settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentitySettings {
    /// App private key, hex (64 or 66 chars)
    #[serde(default)]
    pub app_private_key: Option<String>,
}

/// Path to the config file (~/.gaia/config.toml)
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gaia")
        .join("config.toml")
}

/// Load configuration, falling back to defaults when no file exists.
pub fn load_config() -> GaiaCliConfig {
    let path = config_path();
    if let Ok(contents) = fs::read_to_string(&path) {
        match toml::from_str(&contents) {
            Ok(config) => return config,
            Err(e) => {
                eprintln!("Warning: ignoring malformed config {}: {}", path.display(), e);
            }
        }
    }
    GaiaCliConfig::default()
}

/// Write configuration to disk, creating ~/.gaia/ if needed.
pub fn save_config(config: &GaiaCliConfig) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Set a dotted config key (e.g. `hub.url`) to a value.
pub fn set_value(config: &mut GaiaCliConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "hub.url" => config.hub.url = value.to_string(),
        "identity.app_private_key" => config.identity.app_private_key = Some(value.to_string()),
        other => anyhow::bail!("Unknown config key: {}", other),
    }
    Ok(())
}

//! Designer configuration storage
//!
//! Layout geometry, viewport limits and history depth, persisted as
//! `designer.json` alongside the flow data.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::layout::{LayoutMetrics, ViewportSettings};

/// File name of the persisted configuration
pub const CONFIG_FILE: &str = "designer.json";

fn default_history_limit() -> usize {
    100
}

/// Full designer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerConfig {
    /// Node geometry and spacing
    #[serde(default)]
    pub layout: LayoutMetrics,
    /// Initial pan/zoom and zoom bounds
    #[serde(default)]
    pub viewport: ViewportSettings,
    /// Undo snapshots kept per session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            layout: LayoutMetrics::default(),
            viewport: ViewportSettings::default(),
            history_limit: default_history_limit(),
        }
    }
}

impl DesignerConfig {
    /// Load configuration from disk
    ///
    /// A missing file yields the defaults.
    pub async fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        let config: Self = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        config.viewport.check().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(dir).await?;

        let config_path = dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Designer configuration saved to {:?}", config_path);
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid viewport settings: {0}")]
    Invalid(String),
}

//! Server configuration
//!
//! Read from `flow-server.json` in the data directory, then overridden by
//! environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{env, network, paths};
use crate::error::ServerError;

fn default_host() -> String {
    network::HOST.to_string()
}

fn default_port() -> u16 {
    network::PORT
}

/// Bind address and data location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Not persisted; always the directory the config was loaded from
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: PathBuf::from(paths::DATA_DIR),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `data_dir`; a missing file yields defaults
    pub async fn load(data_dir: &Path) -> Result<Self, ServerError> {
        let config_path = data_dir.join(paths::CONFIG_FILE);

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path).await?;
            serde_json::from_str(&contents).map_err(ServerError::Parse)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Load using the `FLOW_SERVER_*` environment variables
    pub async fn from_env() -> Result<Self, ServerError> {
        let data_dir = std::env::var(env::DATA_DIR).unwrap_or_else(|_| paths::DATA_DIR.to_string());
        let mut config = Self::load(Path::new(&data_dir)).await?;
        config.apply_overrides(std::env::var(env::HOST).ok(), std::env::var(env::PORT).ok())?;
        Ok(config)
    }

    /// Replace host and port with explicitly provided values
    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<(), ServerError> {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ServerError::InvalidPort(port.clone()))?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory holding one JSON file per flow
    pub fn flows_dir(&self) -> PathBuf {
        self.data_dir.join(paths::PROCESS_FLOWS_DIR)
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::ChannelRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub channels: Vec<ChannelRequest>,
    /// User-Agent sent to the platforms; CLI/env values take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for channel in config.channels.iter().filter(|c| !c.platform.is_valid()) {
            tracing::warn!(
                platform = %channel.platform,
                channel_id = %channel.channel_id,
                "Configured channel uses an unsupported platform and will be skipped"
            );
        }
        tracing::info!("Loaded {} channels from {:?}", config.channels.len(), path);
        Ok(config)
    }
}

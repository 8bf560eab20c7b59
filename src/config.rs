//! Configuration management for Chainlet

use crate::error::ChainError;
use crate::miner::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            peer_timeout_ms: default_peer_timeout_ms(),
            bootstrap_peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_reward_amount")]
    pub reward_amount: f64,
    /// Give up on a proof search after this many seconds. Unbounded when unset.
    #[serde(default)]
    pub search_timeout_secs: Option<u64>,
    /// Fixed node identifier; a random one is generated when unset.
    #[serde(default)]
    pub node_id: Option<String>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward_amount: default_reward_amount(),
            search_timeout_secs: None,
            node_id: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.miner.difficulty == 0 || self.miner.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "miner.difficulty must be between 1 and {}",
                MAX_DIFFICULTY
            )));
        }

        if self.network.peer_timeout_ms == 0 {
            return Err(ChainError::ConfigError(
                "network.peer_timeout_ms must be positive".to_string(),
            ));
        }

        if let Some(id) = &self.miner.node_id {
            if id.trim().is_empty() {
                return Err(ChainError::ConfigError("miner.node_id must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Load configuration from `path`. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config: Config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_peer_timeout_ms() -> u64 {
    5000
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_reward_amount() -> f64 {
    1.0
}

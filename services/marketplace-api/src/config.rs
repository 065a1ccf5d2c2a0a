//! Service configuration
//!
//! Loaded from a JSON file whose path comes from the first CLI
//! argument or `MARKETPLACE_API_CONFIG`; falls back to built-in
//! defaults for local runs.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::session::CIPHER_BLOCK_SIZE;

/// One supported chain partition.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Project tag embedded in persisted cache keys.
    #[serde(default = "default_project")]
    pub project_name: String,

    #[serde(default = "default_bind")]
    pub bind_address: String,

    /// Session cipher secret; must be exactly one AES block.
    #[serde(default = "default_secret")]
    pub session_secret: String,

    /// TTL for memoized API responses.
    #[serde(default = "default_api_cache_ttl")]
    pub api_cache_ttl_seconds: u64,

    #[serde(default = "default_chains")]
    pub chains: Vec<ChainConfig>,
}

fn default_project() -> String {
    "openmarket".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_secret() -> String {
    "om_login_salt&$%".to_string()
}

fn default_api_cache_ttl() -> u64 {
    60
}

fn default_chains() -> Vec<ChainConfig> {
    vec![
        ChainConfig { chain_id: 1, name: "eth".to_string() },
        ChainConfig { chain_id: 10, name: "optimism".to_string() },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: default_project(),
            bind_address: default_bind(),
            session_secret: default_secret(),
            api_cache_ttl_seconds: default_api_cache_ttl(),
            chains: default_chains(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_slice(&raw).context("failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.session_secret.len() == CIPHER_BLOCK_SIZE,
            "session_secret must be exactly {} bytes",
            CIPHER_BLOCK_SIZE
        );
        anyhow::ensure!(!self.chains.is_empty(), "at least one chain must be configured");
        Ok(())
    }

    pub fn chain_name(&self, chain_id: i32) -> Option<&str> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .map(|c| c.name.as_str())
    }

    pub fn chain_id(&self, name: &str) -> Option<i32> {
        self.chains
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.chain_id)
    }

    /// chain id → chain name for response assembly.
    pub fn chain_names_by_id(&self) -> HashMap<i32, String> {
        self.chains
            .iter()
            .map(|c| (c.chain_id, c.name.clone()))
            .collect()
    }
}

//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Event journal location
//! - Genesis protocol parameters (owner, fee rate)
//! - Chat webhook for bounty notifications

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::escrow::ProtocolGenesis;
use crate::types::{Identity, MAX_FEE_BPS};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "escrow.db".to_string(),
        }
    }
}

/// Genesis protocol parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Initial owner identity (0x-prefixed, 20 bytes)
    pub owner: String,
    /// Initial fee rate in basis points
    pub fee_bps: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load from specific path, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            // Use embedded default config
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")?
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `ESCROW_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = non_empty("ESCROW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("ESCROW_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = non_empty("ESCROW_DATABASE") {
            self.database.path = path;
        }
        if let Some(owner) = non_empty("ESCROW_OWNER") {
            self.protocol.owner = owner;
        }
        if let Some(url) = non_empty("ESCROW_WEBHOOK_URL") {
            self.notifier.webhook_url = url;
        }
    }

    /// Validated genesis parameters.
    pub fn genesis(&self) -> Result<ProtocolGenesis> {
        if self.protocol.owner.trim().is_empty() {
            return Err(anyhow!(
                "protocol.owner is required (set it in config.toml or ESCROW_OWNER)"
            ));
        }
        let owner: Identity = self
            .protocol
            .owner
            .parse()
            .with_context(|| format!("Invalid protocol.owner: {}", self.protocol.owner))?;
        if owner.is_zero() {
            return Err(anyhow!("protocol.owner must not be the zero identity"));
        }
        if self.protocol.fee_bps > MAX_FEE_BPS {
            return Err(anyhow!(
                "protocol.fee_bps {} exceeds maximum {}",
                self.protocol.fee_bps,
                MAX_FEE_BPS
            ));
        }
        Ok(ProtocolGenesis {
            owner,
            fee_bps: self.protocol.fee_bps,
        })
    }

    /// Webhook URL if notifications are enabled
    pub fn webhook_url(&self) -> Option<&str> {
        let url = self.notifier.webhook_url.trim();
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded default config is validated by tests,
        // so this should never fail. Using a fallback for robustness.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig::default(),
            protocol: ProtocolConfig {
                owner: String::new(),
                fee_bps: 250,
            },
            notifier: NotifierConfig::default(),
        })
    }
}

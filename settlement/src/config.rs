//! Configuration for the settlement layer

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settlement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Payment gateway connection
    pub gateway: GatewayConfig,

    /// Default description prefix for withdrawal entries
    pub withdrawal_description: String,

    /// Default description prefix for deposit entries
    pub deposit_description: String,
}

/// Payment gateway connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL
    pub base_url: String,

    /// API key (public half of the HMAC credential)
    pub api_key: String,

    /// API secret (signing key, never sent on the wire)
    pub api_secret: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            withdrawal_description: "Withdrawal via".to_string(),
            deposit_description: "Deposit via".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.yellowcard.io".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_ms: 100_000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("YC_BASE_URL") {
            config.gateway.base_url = url;
        }
        if let Ok(key) = std::env::var("YC_API_KEY") {
            config.gateway.api_key = key;
        }
        if let Ok(secret) = std::env::var("YC_API_SECRET") {
            config.gateway.api_secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gateway.base_url.is_empty() {
            return Err(Error::Config("gateway.base_url must be set".to_string()));
        }
        if self.gateway.api_key.is_empty() || self.gateway.api_secret.is_empty() {
            return Err(Error::Config(
                "gateway credentials must be set".to_string(),
            ));
        }
        Ok(())
    }
}

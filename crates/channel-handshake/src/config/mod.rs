use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Chain {0} not found in configuration")]
    UnknownChain(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    pub global: GlobalConfig,
    pub handshake: HandshakeParams,
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeParams {
    /// Blocks added to the counterparty's height to form each phase timeout
    pub timeout_horizon: u64,
    /// Refuse to start when either endpoint already left the Idle state
    #[serde(default = "default_check_existing")]
    pub check_existing: bool,
}

fn default_check_existing() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier
    pub chain_id: String,
    /// Tendermint RPC endpoint
    pub rpc_endpoint: String,
    /// Account submitting handshake messages on this chain
    pub signer: String,
    /// Store holding IBC channel state
    #[serde(default = "default_store_key")]
    pub store_key: String,
    /// IBC version used as the key prefix inside the store
    #[serde(default = "default_store_version")]
    pub store_version: u64,
    /// Per-request timeout for RPC calls, e.g. "30s"
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_store_key() -> String {
    "ibc".to_string()
}

fn default_store_version() -> u64 {
    1
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.request_timeout).map_err(|e| {
            ConfigError::Invalid(format!(
                "chain {}: bad request_timeout {:?}: {}",
                self.chain_id, self.request_timeout, e
            ))
        })
    }
}

impl HandshakeConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: HandshakeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get chain configuration by name
    pub fn get_chain(&self, name: &str) -> Result<&ChainConfig, ConfigError> {
        self.chains
            .get(name)
            .ok_or_else(|| ConfigError::UnknownChain(name.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handshake.timeout_horizon == 0 {
            return Err(ConfigError::Invalid("timeout_horizon must be positive".to_string()));
        }
        for (name, chain) in &self.chains {
            if chain.rpc_endpoint.is_empty() {
                return Err(ConfigError::Invalid(format!("chain {}: empty rpc_endpoint", name)));
            }
            if chain.signer.is_empty() {
                return Err(ConfigError::Invalid(format!("chain {}: empty signer", name)));
            }
            chain.request_timeout()?;
        }
        Ok(())
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        let mut chains = HashMap::new();

        chains.insert("chain-a".to_string(), ChainConfig {
            chain_id: "ibc-0".to_string(),
            rpc_endpoint: "http://127.0.0.1:26657".to_string(),
            signer: "cosmos1relayera".to_string(),
            store_key: default_store_key(),
            store_version: default_store_version(),
            request_timeout: default_request_timeout(),
        });

        chains.insert("chain-b".to_string(), ChainConfig {
            chain_id: "ibc-1".to_string(),
            rpc_endpoint: "http://127.0.0.1:26557".to_string(),
            signer: "cosmos1relayerb".to_string(),
            store_key: default_store_key(),
            store_version: default_store_version(),
            request_timeout: default_request_timeout(),
        });

        Self {
            global: GlobalConfig {
                log_level: "info".to_string(),
            },
            handshake: HandshakeParams {
                timeout_horizon: 1000,
                check_existing: true,
            },
            chains,
        }
    }
}

//! Gateway configuration
//!
//! YAML file mapping chain codes to their networks and upstream endpoints:
//!
//! ```yaml
//! chains:
//!   ETH:
//!     networks:
//!       MAINNET:
//!         rpcUrls:
//!           - name: primary
//!             url: https://eth.example.com
//!             limitRps: 50
//!   TRX:
//!     networks:
//!       MAINNET:
//!         rpcUrls:
//!           - url: https://trx.example.com/jsonrpc
//!         httpUrls:
//!           - https://trx.example.com/wallet
//! ```

use omni_jsonrpc::RpcEndpoint;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One upstream RPC endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcUrlConfig {
    #[serde(default)]
    pub name: String,
    pub url: String,
    /// Requests per second, 0 for unlimited.
    #[serde(default)]
    pub limit_rps: u32,
}

impl From<RpcUrlConfig> for RpcEndpoint {
    fn from(config: RpcUrlConfig) -> Self {
        Self { name: config.name, url: config.url, limit_rps: config.limit_rps }
    }
}

/// Configuration of one `TYPE:NETWORK` pair.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainNetworkConfig {
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub rpc_urls: Vec<RpcUrlConfig>,
    /// Native HTTP API endpoints; used by the Tron adapter.
    #[serde(default)]
    pub http_urls: Vec<String>,
}

/// All networks of one chain family.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainTypeConfig {
    #[serde(default)]
    pub networks: BTreeMap<String, ChainNetworkConfig>,
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub chains: BTreeMap<String, ChainTypeConfig>,
}

impl GatewayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

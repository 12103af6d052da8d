//! Chain identifiers

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network name that normalizes to the empty string.
pub const MAINNET: &str = "MAINNET";

/// Identifier of one concrete network of a chain family.
///
/// Serialized as `TYPE:NETWORK`, or just `TYPE` for mainnet:
/// `ETH` is Ethereum mainnet, `ETH:SEPOLIA` is the Sepolia testnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId {
    #[serde(rename = "type")]
    pub chain_type: String,
    pub network: String,
}

impl ChainId {
    pub fn new(chain_type: impl Into<String>, network: impl Into<String>) -> Self {
        Self { chain_type: chain_type.into(), network: network.into() }.normalize()
    }

    /// Uppercase both parts and map `MAINNET` to the empty network.
    pub fn normalize(&self) -> Self {
        let network = self.network.to_uppercase();
        Self {
            chain_type: self.chain_type.to_uppercase(),
            network: if network == MAINNET { String::new() } else { network },
        }
    }

    pub fn is_mainnet(&self) -> bool {
        self.network.is_empty()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.network.is_empty() {
            write!(f, "{}", self.chain_type)
        } else {
            write!(f, "{}:{}", self.chain_type, self.network)
        }
    }
}

impl FromStr for ChainId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let chain_type = parts.next().unwrap_or_default();
        if chain_type.is_empty() {
            return Err(GatewayError::invalid_chain_id(s));
        }
        let network = parts.next().unwrap_or(MAINNET);
        if parts.next().is_some() {
            return Err(GatewayError::invalid_chain_id(s));
        }
        Ok(Self::new(chain_type, network))
    }
}

/// Services a chain adapter exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainService {
    Block,
    Construct,
    Currencies,
}

/// Chain description returned by `GetChain`/`ListChains`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub id: ChainId,
    pub bip44_id: u32,
    pub testnet: bool,
    pub finalized_height: u64,
    pub ms_per_block: u64,
    pub supported_services: Vec<ChainService>,
}

//! Cross-chain currency identifiers
//!
//! A currency id is up to four colon-separated segments:
//! `TYPE[:NETWORK[:ADDRESS[:TOKEN]]]`. `NETWORK = MAINNET` normalizes to the
//! empty string, so native ETH on mainnet is just `ETH` and USDT on ETH
//! mainnet is `ETH::0xdac17f958d2ee523a2206206994597c13d831ec7`.

use crate::chain::{ChainId, MAINNET};
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Globally unique currency identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyId {
    pub chain: ChainId,
    /// Contract address; empty for the native currency.
    pub address: String,
    /// Token id within the contract; reserved for multi-token standards.
    pub token: String,
}

impl CurrencyId {
    pub fn native(chain: ChainId) -> Self {
        Self { chain, address: String::new(), token: String::new() }
    }

    pub fn fungible(chain: ChainId, address: impl Into<String>) -> Self {
        Self { chain, address: address.into(), token: String::new() }
    }

    pub fn is_native(&self) -> bool {
        self.address.is_empty()
    }

    pub fn is_fungible(&self) -> bool {
        !self.address.is_empty() && self.token.is_empty()
    }

    pub fn is_multi_token(&self) -> bool {
        !self.address.is_empty() && !self.token.is_empty()
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chain.chain_type)?;
        // Trailing segments force the network segment even for mainnet.
        if !self.chain.network.is_empty() || !self.address.is_empty() {
            write!(f, ":{}", self.chain.network)?;
        }
        if !self.address.is_empty() {
            write!(f, ":{}", self.address)?;
        }
        if !self.token.is_empty() {
            write!(f, ":{}", self.token)?;
        }
        Ok(())
    }
}

impl FromStr for CurrencyId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.is_empty() || parts.len() > 4 || parts[0].is_empty() {
            return Err(GatewayError::invalid_currency(s));
        }
        let network = parts.get(1).copied().unwrap_or(MAINNET);
        Ok(Self {
            chain: ChainId::new(parts[0], network),
            address: parts.get(2).copied().unwrap_or_default().to_string(),
            token: parts.get(3).copied().unwrap_or_default().to_string(),
        })
    }
}

/// Currency identifier within one chain: `ADDRESS[:TOKEN]`, empty for native.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainCurrencyId {
    pub address: String,
    pub token: String,
}

impl ChainCurrencyId {
    pub fn is_native(&self) -> bool {
        self.address.is_empty()
    }

    pub fn is_fungible(&self) -> bool {
        !self.address.is_empty() && self.token.is_empty()
    }

    pub fn is_multi_token(&self) -> bool {
        !self.address.is_empty() && !self.token.is_empty()
    }
}

impl fmt::Display for ChainCurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        if !self.token.is_empty() {
            write!(f, ":{}", self.token)?;
        }
        Ok(())
    }
}

impl FromStr for ChainCurrencyId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.len() {
            1 => Ok(Self { address: parts[0].to_string(), token: String::new() }),
            2 => Ok(Self { address: parts[0].to_string(), token: parts[1].to_string() }),
            _ => Err(GatewayError::invalid_currency(s)),
        }
    }
}

/// Resolved currency metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: String,
    pub symbol: String,
    pub decimals: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_currency_round_trip() {
        let id: CurrencyId = "ETH".parse().unwrap();
        assert!(id.is_native());
        assert_eq!(id.to_string(), "ETH");
    }

    #[test]
    fn test_fungible_round_trip() {
        let s = "ETH::0xdac17f958d2ee523a2206206994597c13d831ec7";
        let id: CurrencyId = s.parse().unwrap();
        assert!(id.is_fungible());
        assert_eq!(id.chain.chain_type, "ETH");
        assert!(id.chain.is_mainnet());
        assert_eq!(id.to_string(), s);
    }

    #[test]
    fn test_multi_token_round_trip() {
        let s = "ETH:SEPOLIA:0xabc:42";
        let id: CurrencyId = s.parse().unwrap();
        assert!(id.is_multi_token());
        assert_eq!(id.to_string(), s);
    }

    #[test]
    fn test_parse_round_trip_normalized() {
        // parse(format(id)) == id for normalized ids
        for s in ["TRX", "BNB:TESTNET", "TRX::TAddr", "ETH::0xabc:7"] {
            let id: CurrencyId = s.parse().unwrap();
            let again: CurrencyId = id.to_string().parse().unwrap();
            assert_eq!(again, id);
        }
    }

    #[test]
    fn test_too_many_segments_rejected() {
        assert!("ETH:MAINNET:0xabc:1:extra".parse::<CurrencyId>().is_err());
        assert!("0xabc:1:extra".parse::<ChainCurrencyId>().is_err());
    }

    #[test]
    fn test_chain_currency_native() {
        let id: ChainCurrencyId = "".parse().unwrap();
        assert!(id.is_native());
        let id: ChainCurrencyId = "0xabc".parse().unwrap();
        assert!(id.is_fungible());
        let id: ChainCurrencyId = "0xabc:5".parse().unwrap();
        assert!(id.is_multi_token());
    }
}

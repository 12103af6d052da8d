//! Canonical blocks, transactions and transfers

use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Finality tag derived from block age, ordered weakest to strongest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinalityStatus {
    #[default]
    Unspecified,
    Unsafe,
    Safe,
    Finalized,
}

impl FromStr for FinalityStatus {
    type Err = crate::error::GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNSPECIFIED" => Ok(Self::Unspecified),
            "UNSAFE" => Ok(Self::Unsafe),
            "SAFE" => Ok(Self::Safe),
            "FINALIZED" => Ok(Self::Finalized),
            _ => Err(crate::error::GatewayError::InvalidArgument(format!(
                "invalid finality status: {s}"
            ))),
        }
    }
}

/// Amount of some currency, identified by its cross-chain currency id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyAmount {
    pub currency_id: String,
    pub value: U256,
}

/// Whether a transfer was directly confirmed by the transaction or merely
/// observed in an event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Observed,
    Confirmed,
}

/// A single movement of value inside a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: Bytes,
    pub tx_id: Bytes,
    pub op_id: Bytes,
    pub from: String,
    pub to: String,
    pub status: TransferStatus,
    pub amount: CurrencyAmount,
}

/// Canonical transaction with its decoded transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Bytes,
    pub from: String,
    pub to: String,
    pub block_id: Bytes,
    pub tx_type: u32,
    pub fee: U256,
    pub amount: U256,
    pub index: u32,
    pub transfers: Vec<Transfer>,
}

/// Canonical block header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub id: Bytes,
    pub number: u64,
    pub parent_id: Bytes,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub finality: FinalityStatus,
}

/// Canonical block: header plus ordered transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finality_ordering() {
        assert!(FinalityStatus::Unspecified < FinalityStatus::Unsafe);
        assert!(FinalityStatus::Unsafe < FinalityStatus::Safe);
        assert!(FinalityStatus::Safe < FinalityStatus::Finalized);
    }

    #[test]
    fn test_finality_parse() {
        assert_eq!("finalized".parse::<FinalityStatus>().unwrap(), FinalityStatus::Finalized);
        assert_eq!("SAFE".parse::<FinalityStatus>().unwrap(), FinalityStatus::Safe);
        assert!("pending".parse::<FinalityStatus>().is_err());
    }
}

//! Ethereum wire types
//!
//! Decoded leniently: some Ethereum-compatible chains return `0x` for zero,
//! hex with leading zeros stripped off or added, or 21-byte prefixed
//! addresses. Header fields that such chains omit entirely are optional;
//! transaction `nonce`/`v`/`r`/`s` must be present but tolerate the
//! shortened forms.

use alloy_primitives::{Address, Bytes, B256, U256};
use omni_jsonrpc::hexnum::lenient;
use serde::Deserialize;

/// Block header as returned by `eth_getBlockByNumber`/`eth_getBlockByHash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHeader {
    #[serde(deserialize_with = "lenient::b256")]
    pub hash: B256,
    #[serde(deserialize_with = "lenient::b256")]
    pub parent_hash: B256,
    #[serde(deserialize_with = "lenient::u64")]
    pub number: u64,
    #[serde(deserialize_with = "lenient::u64")]
    pub timestamp: u64,
    /// Missing on chains that do not track state roots.
    #[serde(default, deserialize_with = "lenient::b256_opt")]
    pub state_root: Option<B256>,
}

/// Transaction object inside a full block response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    #[serde(deserialize_with = "lenient::b256")]
    pub hash: B256,
    #[serde(deserialize_with = "lenient::u64")]
    pub nonce: u64,
    #[serde(default, deserialize_with = "lenient::address_opt")]
    pub from: Option<Address>,
    #[serde(default, deserialize_with = "lenient::address_opt")]
    pub to: Option<Address>,
    #[serde(default, deserialize_with = "lenient::u256_opt")]
    pub value: Option<U256>,
    #[serde(default, rename = "type", deserialize_with = "lenient::u64_opt")]
    pub tx_type: Option<u64>,
    #[serde(deserialize_with = "lenient::u256")]
    pub v: U256,
    #[serde(deserialize_with = "lenient::u256")]
    pub r: U256,
    #[serde(deserialize_with = "lenient::u256")]
    pub s: U256,
    #[serde(default, deserialize_with = "lenient::u64_opt")]
    pub transaction_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient::b256_opt")]
    pub block_hash: Option<B256>,
}

/// Full block: header fields plus the transaction list.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcHeaderWithBody {
    #[serde(flatten)]
    pub header: RpcHeader,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

/// Log entry from `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    #[serde(deserialize_with = "lenient::address")]
    pub address: Address,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default, deserialize_with = "lenient::u64_opt")]
    pub log_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient::u64_opt")]
    pub transaction_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient::b256_opt")]
    pub transaction_hash: Option<B256>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_tolerates_non_canonical_fields() {
        // Bare `0x` state root, zero-padded number: the Tron quirks.
        let raw = r#"{
            "hash": "0xe670ec64341771606e55d6b4ca35a1a6b75ee3d5145a99d05921026d15273311",
            "parentHash": "0x",
            "stateRoot": "0x",
            "number": "0x000f4240",
            "timestamp": "0x65f00000",
            "transactions": []
        }"#;
        let block: RpcHeaderWithBody = serde_json::from_str(raw).unwrap();
        assert_eq!(block.header.number, 1_000_000);
        assert_eq!(block.header.parent_hash, B256::ZERO);
        assert_eq!(block.header.state_root, Some(B256::ZERO));
        assert!(block.transactions.is_empty());

        // Entirely missing state root is fine as well.
        let raw = r#"{
            "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "parentHash": "0x",
            "number": "0x1",
            "timestamp": "0x0"
        }"#;
        let block: RpcHeaderWithBody = serde_json::from_str(raw).unwrap();
        assert_eq!(block.header.state_root, None);
    }

    #[test]
    fn test_transaction_requires_signature_fields() {
        let raw = r#"{
            "hash": "0x01",
            "nonce": "0x0005",
            "from": "0x41dac17f958d2ee523a2206206994597c13d831ec7",
            "to": null,
            "value": "0x",
            "v": "0x1b",
            "r": "0x0abc",
            "s": "0x1"
        }"#;
        let tx: RpcTransaction = serde_json::from_str(raw).unwrap();
        assert_eq!(tx.nonce, 5);
        assert_eq!(tx.value, Some(U256::ZERO));
        assert_eq!(tx.v, U256::from(27));
        assert!(tx.to.is_none());
        // 21-byte prefixed sender decodes to its 20-byte form.
        assert_eq!(
            tx.from.unwrap().to_string().to_lowercase(),
            "0xdac17f958d2ee523a2206206994597c13d831ec7"
        );

        // Missing `v` is an error, not a default.
        let raw = r#"{"hash": "0x01", "nonce": "0x0", "r": "0x1", "s": "0x1"}"#;
        assert!(serde_json::from_str::<RpcTransaction>(raw).is_err());
    }
}

//! Typed call constructors for the consumed Ethereum JSON-RPC methods

use crate::eth::types::{RpcHeaderWithBody, RpcLog};
use alloy_primitives::{Address, Bytes, B256, U256};
use omni_jsonrpc::hexnum;
use omni_jsonrpc::RpcCall;
use serde::Serialize;
use serde_json::{json, Value};

/// Block tag for nonce queries of transactions about to be built.
pub const PENDING_TAG: &str = "pending";

/// Call/estimate request body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

pub fn chain_id() -> RpcCall<U256> {
    RpcCall::with_convert("eth_chainId", vec![], |raw: String| hexnum::parse_u256(&raw))
}

pub fn block_number() -> RpcCall<u64> {
    RpcCall::with_convert("eth_blockNumber", vec![], |raw: String| hexnum::parse_u64(&raw))
}

pub fn get_block_by_number(number: u64, full_tx: bool) -> RpcCall<RpcHeaderWithBody> {
    RpcCall::new(
        "eth_getBlockByNumber",
        vec![json!(hexnum::format_u64(number)), json!(full_tx)],
    )
}

pub fn get_block_by_hash(hash: B256, full_tx: bool) -> RpcCall<RpcHeaderWithBody> {
    RpcCall::new("eth_getBlockByHash", vec![json!(hash), json!(full_tx)])
}

/// All logs of one block, queried by block hash.
pub fn get_logs(block_hash: B256) -> RpcCall<Vec<RpcLog>> {
    RpcCall::new("eth_getLogs", vec![json!({ "blockHash": block_hash })])
}

pub fn transaction_count(address: Address, tag: &str) -> RpcCall<u64> {
    RpcCall::with_convert(
        "eth_getTransactionCount",
        vec![json!(address), json!(tag)],
        |raw: String| hexnum::parse_u64(&raw),
    )
}

pub fn gas_price() -> RpcCall<U256> {
    RpcCall::with_convert("eth_gasPrice", vec![], |raw: String| hexnum::parse_u256(&raw))
}

pub fn estimate_gas(request: &CallRequest) -> RpcCall<u64> {
    RpcCall::with_convert("eth_estimateGas", vec![json!(request)], |raw: String| {
        hexnum::parse_u64(&raw)
    })
}

pub fn eth_call(request: &CallRequest, tag: &str) -> RpcCall<Bytes> {
    RpcCall::new("eth_call", vec![json!(request), json!(tag)])
}

pub fn send_raw_transaction(raw_tx: &[u8]) -> RpcCall<B256> {
    RpcCall::new("eth_sendRawTransaction", vec![json!(format!("0x{}", hex::encode(raw_tx)))])
}

pub fn client_version() -> RpcCall<String> {
    RpcCall::new("web3_clientVersion", vec![])
}

pub fn net_version() -> RpcCall<String> {
    RpcCall::new("net_version", vec![])
}

pub fn net_listening() -> RpcCall<bool> {
    RpcCall::new("net_listening", vec![])
}

pub fn net_peer_count() -> RpcCall<u64> {
    RpcCall::with_convert("net_peerCount", vec![], |raw: String| hexnum::parse_u64(&raw))
}

/// `eth_syncing` returns `false` or a progress object; kept dynamic.
pub fn syncing() -> RpcCall<Value> {
    RpcCall::new("eth_syncing", vec![])
}

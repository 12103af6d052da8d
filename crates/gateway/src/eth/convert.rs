//! Canonical block conversion
//!
//! Loads the block's logs in one query, groups them by transaction index and
//! produces the canonical block: native transfers from transaction values,
//! token transfers decoded from ERC-20 `Transfer` logs.

use crate::adapter::ListBlocksRequest;
use crate::eth::calls;
use crate::eth::types::{RpcHeaderWithBody, RpcLog, RpcTransaction};
use alloy_primitives::{Address, Bytes, B256, U256};
use omni_jsonrpc::{RpcBatch, RpcClient};
use omni_model::{
    Block, BlockHeader, CurrencyAmount, FinalityStatus, GatewayError, Transaction, Transfer,
    TransferStatus,
};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// `keccak256("Transfer(address,address,uint256)")`, the ERC-20 transfer
/// event topic.
pub const ERC20_TRANSFER_TOPIC: &str =
    "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Age-based finality heuristic. Thresholds are chain-agnostic; the slot
/// duration is the per-chain knob.
#[derive(Debug, Clone, Copy)]
pub struct FinalityPolicy {
    pub slot: Duration,
}

impl FinalityPolicy {
    pub const fn new(slot: Duration) -> Self {
        Self { slot }
    }

    pub fn status(&self, block_timestamp: u64, now: u64) -> FinalityStatus {
        let slot = self.slot.as_secs();
        if block_timestamp < now.saturating_sub(54 * slot) {
            FinalityStatus::Finalized
        } else if block_timestamp < now.saturating_sub(32 * slot) {
            FinalityStatus::Safe
        } else {
            FinalityStatus::Unsafe
        }
    }
}

impl Default for FinalityPolicy {
    // Ethereum slot time.
    fn default() -> Self {
        Self::new(Duration::from_secs(12))
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Converts raw chain blocks into the canonical model.
pub struct BlockConverter<'a> {
    /// Chain id string, the currency prefix of decoded transfers.
    pub chain: String,
    pub client: &'a dyn RpcClient,
    pub address_to_string: fn(Address) -> String,
    pub finality: FinalityPolicy,
}

impl BlockConverter<'_> {
    pub async fn convert(&self, block: RpcHeaderWithBody) -> Result<Block, GatewayError> {
        let logs = self.load_and_group_logs(&block).await?;

        let header = BlockHeader {
            id: Bytes::copy_from_slice(block.header.hash.as_slice()),
            number: block.header.number,
            parent_id: Bytes::copy_from_slice(block.header.parent_hash.as_slice()),
            timestamp: block.header.timestamp,
            finality: self.finality.status(block.header.timestamp, unix_now()),
        };

        let mut transactions = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            let tx_logs = tx
                .transaction_index
                .and_then(|index| logs.get(&index))
                .map(Vec::as_slice)
                .unwrap_or_default();
            transactions.push(self.convert_transaction(tx, tx_logs)?);
        }

        Ok(Block { header, transactions })
    }

    async fn load_and_group_logs(
        &self,
        block: &RpcHeaderWithBody,
    ) -> Result<HashMap<u64, Vec<RpcLog>>, GatewayError> {
        debug!(block = block.header.number, "loading logs for block");
        let logs = calls::get_logs(block.header.hash)
            .call(self.client)
            .await
            .map_err(|err| GatewayError::unavailable(format!("failed to load logs: {err}")))?;

        let mut grouped: HashMap<u64, Vec<RpcLog>> = HashMap::new();
        for log in logs {
            grouped.entry(log.transaction_index.unwrap_or_default()).or_default().push(log);
        }
        Ok(grouped)
    }

    fn convert_transaction(
        &self,
        tx: &RpcTransaction,
        logs: &[RpcLog],
    ) -> Result<Transaction, GatewayError> {
        let mut transfers = Vec::new();

        let value = tx.value.unwrap_or_default();
        if value > U256::ZERO {
            transfers.push(self.native_transfer(tx, value));
        }
        for log in logs {
            if let Some(transfer) = self.token_transfer(tx, log) {
                transfers.push(transfer);
            }
        }

        Ok(Transaction {
            id: Bytes::copy_from_slice(tx.hash.as_slice()),
            from: self.format_address(tx.from),
            to: self.format_address(tx.to),
            block_id: tx
                .block_hash
                .map(|hash| Bytes::copy_from_slice(hash.as_slice()))
                .unwrap_or_default(),
            tx_type: tx.tx_type.unwrap_or_default() as u32,
            fee: U256::ZERO,
            amount: value,
            index: tx.transaction_index.unwrap_or_default() as u32,
            transfers,
        })
    }

    fn native_transfer(&self, tx: &RpcTransaction, value: U256) -> Transfer {
        // Suffix 0x00 keeps the native transfer id distinct from log ids.
        let id = transfer_id(tx.hash, &[0]);
        Transfer {
            id: id.clone(),
            tx_id: Bytes::copy_from_slice(tx.hash.as_slice()),
            op_id: id,
            from: self.format_address(tx.from),
            to: self.format_address(tx.to),
            status: TransferStatus::Confirmed,
            amount: CurrencyAmount { currency_id: self.chain.clone(), value },
        }
    }

    fn token_transfer(&self, tx: &RpcTransaction, log: &RpcLog) -> Option<Transfer> {
        if log.topics.len() < 3 {
            return None;
        }
        if !format!("{:x}", log.topics[0]).ends_with(ERC20_TRANSFER_TOPIC) {
            return None;
        }

        let from = topic_address(log.topics[1]);
        let to = topic_address(log.topics[2]);
        let value = log_value(&log.data);
        let id = transfer_id(tx.hash, &index_bytes(log.log_index.unwrap_or_default()));
        let currency_id =
            format!("{}:{}", self.chain, (self.address_to_string)(log.address));

        Some(Transfer {
            id: id.clone(),
            tx_id: Bytes::copy_from_slice(tx.hash.as_slice()),
            op_id: id,
            from: (self.address_to_string)(from),
            to: (self.address_to_string)(to),
            status: TransferStatus::Observed,
            amount: CurrencyAmount { currency_id, value },
        })
    }

    fn format_address(&self, address: Option<Address>) -> String {
        address.map(self.address_to_string).unwrap_or_default()
    }
}

/// Stream a converted block range into `tx`.
///
/// Issues one batched range query clamped to the chain tip, converts each
/// block in order, and stops early once a block falls below the requested
/// finality; a first block already below it is an out-of-range error.
pub async fn stream_blocks(
    converter: &BlockConverter<'_>,
    request: ListBlocksRequest,
    tx: mpsc::Sender<Block>,
) -> Result<(), GatewayError> {
    debug!(start = request.start_number, count = ?request.count, "list blocks");

    let top = calls::block_number()
        .call(converter.client)
        .await
        .map_err(|err| GatewayError::unavailable(format!("failed to get tip: {err}")))?;

    let start = request.start_number;
    let end = (start + request.effective_count()).min(top + 1);
    debug!(start, end, top, "block range");
    if start >= end {
        return Err(GatewayError::block_out_of_range());
    }

    let mut batch = RpcBatch::new();
    let slots: Vec<_> = (start..end)
        .map(|number| batch.push(calls::get_block_by_number(number, true)))
        .collect();
    batch
        .call(converter.client)
        .await
        .map_err(|err| GatewayError::unavailable(format!("failed to load blocks: {err}")))?;
    debug!(count = slots.len(), "blocks received");

    for (idx, slot) in slots.into_iter().enumerate() {
        let raw = slot.resolve(&mut batch).map_err(|err| {
            error!(number = start + idx as u64, error = %err, "failed to decode block");
            GatewayError::internal(format!("failed to decode block: {err}"))
        })?;
        let block = converter.convert(raw).await?;

        if block.header.finality < request.min_finality {
            // The caller is already past the finality horizon.
            if idx == 0 {
                return Err(GatewayError::block_out_of_range());
            }
            break;
        }

        debug!(number = block.header.number, txs = block.transactions.len(), "send block");
        if tx.send(block).await.is_err() {
            return Err(GatewayError::internal("block stream receiver dropped"));
        }
    }
    debug!("done sending blocks");
    Ok(())
}

fn transfer_id(tx_hash: B256, suffix: &[u8]) -> Bytes {
    let mut id = Vec::with_capacity(32 + suffix.len());
    id.extend_from_slice(tx_hash.as_slice());
    id.extend_from_slice(suffix);
    Bytes::from(id)
}

/// Minimal big-endian bytes of a log index; empty for zero.
fn index_bytes(index: u64) -> Vec<u8> {
    let bytes = index.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Low 20 bytes of an indexed address topic.
fn topic_address(topic: B256) -> Address {
    Address::from_slice(&topic[12..])
}

/// Log data as a big-endian uint256; oversized payloads keep the low words.
fn log_value(data: &[u8]) -> U256 {
    if data.len() > 32 {
        U256::from_be_slice(&data[data.len() - 32..])
    } else {
        U256::from_be_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use omni_jsonrpc::{RawCall, RpcBatch, RpcClientError};
    use serde_json::json;

    fn eth_address_to_string(address: Address) -> String {
        address.to_checksum(None)
    }

    /// Serves one canned `eth_getLogs` response.
    struct LogsClient {
        logs: serde_json::Value,
    }

    #[async_trait::async_trait]
    impl RpcClient for LogsClient {
        async fn call_raw(&self, call: &mut RawCall) -> Result<(), RpcClientError> {
            assert_eq!(call.method, "eth_getLogs");
            call.result = Some(
                serde_json::value::RawValue::from_string(self.logs.to_string()).unwrap(),
            );
            Ok(())
        }

        async fn batch_call(&self, _batch: &mut RpcBatch) -> Result<(), RpcClientError> {
            unreachable!("converter only issues single log queries")
        }
    }

    fn raw_block(value: &str, timestamp: u64) -> RpcHeaderWithBody {
        serde_json::from_value(json!({
            "hash": format!("0x{:064x}", 0xb10cu64),
            "parentHash": format!("0x{:064x}", 0xb10bu64),
            "number": "0x64",
            "timestamp": format!("0x{timestamp:x}"),
            "transactions": [{
                "hash": format!("0x{:064x}", 0xfeedu64),
                "nonce": "0x1",
                "from": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                "value": value,
                "v": "0x25", "r": "0x1", "s": "0x1",
                "transactionIndex": "0x0",
                "blockHash": format!("0x{:064x}", 0xb10cu64)
            }]
        }))
        .unwrap()
    }

    fn converter(client: &LogsClient) -> BlockConverter<'_> {
        BlockConverter {
            chain: "ETH".to_string(),
            client,
            address_to_string: eth_address_to_string,
            finality: FinalityPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_erc20_transfer_decoding() {
        let token = address!("cccccccccccccccccccccccccccccccccccccccc");
        let from = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let to = address!("dddddddddddddddddddddddddddddddddddddddd");
        let client = LogsClient {
            logs: json!([{
                "address": token,
                "topics": [
                    format!("0x{ERC20_TRANSFER_TOPIC}"),
                    format!("0x000000000000000000000000{}", hex::encode(from)),
                    format!("0x000000000000000000000000{}", hex::encode(to)),
                ],
                "data": format!("0x{:064x}", 100),
                "logIndex": "0x2",
                "transactionIndex": "0x0",
                "transactionHash": format!("0x{:064x}", 0xfeedu64)
            }]),
        };

        // Zero value: no native transfer, only the decoded token transfer.
        let block = converter(&client).convert(raw_block("0x0", 1_700_000_000)).await.unwrap();
        assert_eq!(block.header.number, 100);
        assert_eq!(block.transactions.len(), 1);

        let tx = &block.transactions[0];
        assert_eq!(tx.transfers.len(), 1);
        let transfer = &tx.transfers[0];
        assert_eq!(transfer.status, TransferStatus::Observed);
        assert_eq!(transfer.from, from.to_checksum(None));
        assert_eq!(transfer.to, to.to_checksum(None));
        assert_eq!(transfer.amount.value, U256::from(100));
        assert_eq!(transfer.amount.currency_id, format!("ETH:{}", token.to_checksum(None)));
        // id = tx hash ‖ log index bytes
        assert_eq!(transfer.id[..32], tx.id[..]);
        assert_eq!(&transfer.id[32..], &[2]);
    }

    #[tokio::test]
    async fn test_native_and_token_transfers_coexist() {
        let token = address!("cccccccccccccccccccccccccccccccccccccccc");
        let client = LogsClient {
            logs: json!([
                {
                    "address": token,
                    "topics": [
                        format!("0x{ERC20_TRANSFER_TOPIC}"),
                        format!("0x{:064x}", 0xau64),
                        format!("0x{:064x}", 0xbu64),
                    ],
                    "data": format!("0x{:064x}", 7),
                    "logIndex": "0x0",
                    "transactionIndex": "0x0"
                },
                {
                    // Non-transfer topic is skipped.
                    "address": token,
                    "topics": [format!("0x{:064x}", 1u64)],
                    "data": "0x",
                    "logIndex": "0x1",
                    "transactionIndex": "0x0"
                }
            ]),
        };

        let block = converter(&client).convert(raw_block("0x64", 1_700_000_000)).await.unwrap();
        let tx = &block.transactions[0];
        assert_eq!(tx.amount, U256::from(100));
        assert_eq!(tx.transfers.len(), 2);

        let native = &tx.transfers[0];
        assert_eq!(native.status, TransferStatus::Confirmed);
        assert_eq!(native.amount.currency_id, "ETH");
        assert_eq!(&native.id[32..], &[0]);

        let token_transfer = &tx.transfers[1];
        assert_eq!(token_transfer.status, TransferStatus::Observed);
        // Zero log index keeps an empty suffix, still distinct from native.
        assert_eq!(token_transfer.id.len(), 32);
    }

    #[test]
    fn test_finality_policy_thresholds() {
        let policy = FinalityPolicy::default();
        let now = 1_000_000;
        assert_eq!(policy.status(now, now), FinalityStatus::Unsafe);
        assert_eq!(policy.status(now - 33 * 12, now), FinalityStatus::Safe);
        assert_eq!(policy.status(now - 55 * 12, now), FinalityStatus::Finalized);

        let tron = FinalityPolicy::new(Duration::from_secs(3));
        assert_eq!(tron.status(now - 55 * 3, now), FinalityStatus::Finalized);
        assert_eq!(tron.status(now - 33 * 3, now), FinalityStatus::Safe);
        assert_eq!(tron.status(now - 20 * 3, now), FinalityStatus::Unsafe);
    }

    #[test]
    fn test_index_bytes_minimal() {
        assert!(index_bytes(0).is_empty());
        assert_eq!(index_bytes(2), vec![2]);
        assert_eq!(index_bytes(0x1234), vec![0x12, 0x34]);
    }

    /// Serves a small chain: a tip, empty blocks with fixed timestamps and
    /// no logs.
    struct ChainClient {
        top: u64,
        /// block number → timestamp
        timestamps: HashMap<u64, u64>,
    }

    impl ChainClient {
        fn block_json(&self, number: u64) -> serde_json::Value {
            json!({
                "hash": format!("0x{number:064x}"),
                "parentHash": format!("0x{:064x}", number.saturating_sub(1)),
                "number": format!("0x{number:x}"),
                "timestamp": format!("0x{:x}", self.timestamps[&number]),
                "transactions": []
            })
        }
    }

    #[async_trait::async_trait]
    impl RpcClient for ChainClient {
        async fn call_raw(&self, call: &mut RawCall) -> Result<(), RpcClientError> {
            let result = match call.method.as_str() {
                "eth_blockNumber" => json!(format!("0x{:x}", self.top)),
                "eth_getLogs" => json!([]),
                other => panic!("unexpected method {other}"),
            };
            call.result =
                Some(serde_json::value::RawValue::from_string(result.to_string()).unwrap());
            Ok(())
        }

        async fn batch_call(&self, batch: &mut RpcBatch) -> Result<(), RpcClientError> {
            for call in &mut batch.calls {
                assert_eq!(call.method, "eth_getBlockByNumber");
                let number =
                    omni_jsonrpc::hexnum::parse_u64(call.params[0].as_str().unwrap()).unwrap();
                call.result = Some(serde_json::value::RawValue::from_string(
                    self.block_json(number).to_string(),
                )?);
            }
            Ok(())
        }
    }

    fn stream_converter(client: &ChainClient) -> BlockConverter<'_> {
        BlockConverter {
            chain: "ETH".to_string(),
            client,
            address_to_string: eth_address_to_string,
            finality: FinalityPolicy::default(),
        }
    }

    async fn collect_stream(
        client: &ChainClient,
        request: ListBlocksRequest,
    ) -> (Vec<u64>, Result<(), GatewayError>) {
        let (tx, mut rx) = mpsc::channel(16);
        let result = stream_blocks(&stream_converter(client), request, tx).await;
        let mut numbers = Vec::new();
        while let Ok(block) = rx.try_recv() {
            numbers.push(block.header.number);
        }
        (numbers, result)
    }

    #[tokio::test]
    async fn test_stream_clamps_to_tip() {
        let now = unix_now();
        let client = ChainClient {
            top: 101,
            timestamps: (90..=101).map(|n| (n, now - 100_000)).collect(),
        };
        let request =
            ListBlocksRequest { start_number: 98, count: Some(10), min_finality: Default::default() };
        let (numbers, result) = collect_stream(&client, request).await;
        result.unwrap();
        assert_eq!(numbers, vec![98, 99, 100, 101]);
    }

    #[tokio::test]
    async fn test_stream_past_tip_is_out_of_range() {
        let client = ChainClient { top: 50, timestamps: HashMap::new() };
        let request =
            ListBlocksRequest { start_number: 51, count: None, min_finality: Default::default() };
        let (numbers, result) = collect_stream(&client, request).await;
        assert!(numbers.is_empty());
        assert!(matches!(result, Err(GatewayError::OutOfRange(_))));
    }

    #[tokio::test]
    async fn test_stream_truncates_below_finality() {
        let now = unix_now();
        // Blocks 10-11 are finalized, 12 and later are fresh.
        let mut timestamps: HashMap<u64, u64> = HashMap::new();
        timestamps.insert(10, now - 100_000);
        timestamps.insert(11, now - 100_000);
        for n in 12..=20 {
            timestamps.insert(n, now);
        }
        let client = ChainClient { top: 20, timestamps };

        let request = ListBlocksRequest {
            start_number: 10,
            count: Some(10),
            min_finality: FinalityStatus::Finalized,
        };
        let (numbers, result) = collect_stream(&client, request).await;
        result.unwrap();
        assert_eq!(numbers, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_stream_fails_when_first_block_not_final() {
        let now = unix_now();
        let client = ChainClient {
            top: 20,
            timestamps: (18..=20).map(|n| (n, now)).collect(),
        };
        // Everything past the finality horizon: zero blocks, out of range.
        let request = ListBlocksRequest {
            start_number: 18,
            count: Some(10),
            min_finality: FinalityStatus::Finalized,
        };
        let (numbers, result) = collect_stream(&client, request).await;
        assert!(numbers.is_empty());
        assert!(matches!(result, Err(GatewayError::OutOfRange(_))));
    }
}

//! Tron transfer construction and broadcast
//!
//! Tron constructs transactions server-side through the HTTP API. Fees are
//! resource-based: bandwidth is estimated from the raw transaction size plus
//! fixed signing overhead, energy comes from a constant-contract dry run,
//! and the sun prices of both are chain parameters refreshed at most every
//! ten seconds.

use crate::adapter::{CreateTransferRequest, SendRequest, SendResponse};
use crate::eth::erc20;
use crate::trx::api::{
    BroadcastTransactionRequest, CreateTransactionRequest, TriggerConstantContractRequest,
    TriggerSmartContractRequest,
};
use crate::trx::TrxAdapter;
use alloy_primitives::{Bytes, U256};
use omni_model::{GatewayError, TransactionIntent};
use parking_lot::Mutex;
use serde_json::value::RawValue;
use std::time::{Duration, Instant};
use tracing::debug;

/// Signature, result and header overhead on top of `raw_data_hex` bytes.
const NATIVE_BANDWIDTH_OVERHEAD: u64 = 64 + 67 + 3;
/// TRC-20 trigger overhead plus correction.
const TRC20_BANDWIDTH_OVERHEAD: u64 = 134 + 6;

pub(crate) const FEE_PRICES_TTL: Duration = Duration::from_secs(10);

/// Cap on the energy fee of a TRC-20 trigger, in suns (150 TRX).
const TRC20_FEE_LIMIT_SUN: u64 = 150_000_000;

const PARAM_BANDWIDTH_PRICE: &str = "getTransactionFee";
const PARAM_ENERGY_PRICE: &str = "getEnergyFee";

/// Sun prices of one bandwidth byte and one energy unit.
#[derive(Debug, Clone, Copy)]
pub struct FeePrices {
    pub bandwidth_price: u64,
    pub energy_price: u64,
}

/// Single-value cache with a fixed time-to-live.
pub struct ExpiringCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> ExpiringCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: Mutex::new(None) }
    }

    pub fn get(&self) -> Option<T> {
        let slot = self.slot.lock();
        slot.as_ref()
            .filter(|(updated, _)| updated.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn set(&self, value: T) {
        *self.slot.lock() = Some((Instant::now(), value));
    }
}

fn native_bandwidth(raw_hex_len: usize) -> u64 {
    raw_hex_len as u64 / 2 + NATIVE_BANDWIDTH_OVERHEAD
}

fn trc20_bandwidth(raw_hex_len: usize) -> u64 {
    raw_hex_len as u64 / 2 + TRC20_BANDWIDTH_OVERHEAD
}

impl TrxAdapter {
    pub(crate) async fn fee_prices(&self) -> Result<FeePrices, GatewayError> {
        if let Some(prices) = self.fee_cache.get() {
            return Ok(prices);
        }
        let params = self.api.get_chain_parameters().await?;
        let lookup = |key: &str| {
            params
                .chain_parameter
                .iter()
                .find(|param| param.key == key)
                .and_then(|param| param.value)
                .ok_or_else(|| {
                    GatewayError::unavailable(format!("chain parameter {key} is missing"))
                })
        };
        let prices = FeePrices {
            bandwidth_price: lookup(PARAM_BANDWIDTH_PRICE)? as u64,
            energy_price: lookup(PARAM_ENERGY_PRICE)? as u64,
        };
        debug!(?prices, "fee prices refreshed");
        self.fee_cache.set(prices);
        Ok(prices)
    }

    pub(crate) async fn create_transfer_impl(
        &self,
        request: CreateTransferRequest,
    ) -> Result<TransactionIntent, GatewayError> {
        let currency = self.eth.currencies.parse_chain_currency(&request.amount.currency_id)?;
        let prices = self.fee_prices().await?;

        if currency.is_native() {
            self.create_native_transfer(request, prices).await
        } else if currency.is_fungible() {
            self.create_trc20_transfer(request, &currency.address, prices).await
        } else {
            Err(GatewayError::invalid_currency(&request.amount.currency_id))
        }
    }

    async fn create_native_transfer(
        &self,
        request: CreateTransferRequest,
        prices: FeePrices,
    ) -> Result<TransactionIntent, GatewayError> {
        let amount: u64 = request
            .amount
            .value
            .try_into()
            .map_err(|_| GatewayError::invalid_amount("value exceeds 64 bits"))?;

        let response = self
            .api
            .create_transaction(&CreateTransactionRequest {
                owner_address: request.from.clone(),
                to_address: request.to.clone(),
                amount,
                visible: true,
            })
            .await?;
        if let Some(error) = response.error.filter(|e| !e.is_empty()) {
            return Err(GatewayError::internal(format!("createtransaction: {error}")));
        }

        let raw_hex = response
            .raw_data_hex
            .ok_or_else(|| GatewayError::internal("createtransaction: missing raw_data_hex"))?;
        let bandwidth = native_bandwidth(raw_hex.len());
        let fee = U256::from(bandwidth) * U256::from(prices.bandwidth_price);
        debug!(bandwidth, fee = %fee, "native transfer constructed");

        self.intent(response.tx_id, response.raw_data, fee)
    }

    async fn create_trc20_transfer(
        &self,
        request: CreateTransferRequest,
        token: &str,
        prices: FeePrices,
    ) -> Result<TransactionIntent, GatewayError> {
        let to = omni_chains::trx::address_from_base58(&request.to)
            .map_err(|_| GatewayError::invalid_address(&request.to))?;
        let data = hex::encode(erc20::encode_transfer(to, request.amount.value));

        let estimate = self
            .api
            .trigger_constant_contract(&TriggerConstantContractRequest {
                owner_address: request.from.clone(),
                contract_address: token.to_string(),
                data: data.clone(),
                visible: true,
            })
            .await?;
        if !estimate.result.result {
            return Err(GatewayError::internal(format!(
                "triggerconstantcontract: {}",
                estimate.result
            )));
        }
        let energy = estimate.energy_used;

        let trigger = self
            .api
            .trigger_smart_contract(&TriggerSmartContractRequest {
                owner_address: request.from.clone(),
                contract_address: token.to_string(),
                fee_limit: TRC20_FEE_LIMIT_SUN,
                call_value: 0,
                data,
                visible: true,
            })
            .await?;
        if !trigger.result.result {
            return Err(GatewayError::internal(format!(
                "triggersmartcontract: {}",
                trigger.result
            )));
        }
        let transaction = trigger
            .transaction
            .ok_or_else(|| GatewayError::internal("triggersmartcontract: missing transaction"))?;

        let raw_hex = transaction
            .raw_data_hex
            .ok_or_else(|| GatewayError::internal("triggersmartcontract: missing raw_data_hex"))?;
        let bandwidth = trc20_bandwidth(raw_hex.len());
        let fee = U256::from(bandwidth) * U256::from(prices.bandwidth_price)
            + U256::from(energy) * U256::from(prices.energy_price);
        debug!(bandwidth, energy, fee = %fee, "trc20 transfer constructed");

        self.intent(transaction.tx_id, transaction.raw_data, fee)
    }

    fn intent(
        &self,
        tx_id: String,
        raw_data: Option<Box<RawValue>>,
        fee: U256,
    ) -> Result<TransactionIntent, GatewayError> {
        let tx_id = hex::decode(&tx_id)
            .map_err(|_| GatewayError::internal(format!("invalid txID: {tx_id}")))?;
        if tx_id.len() != 32 {
            return Err(GatewayError::internal("txID is not a 32-byte digest"));
        }
        let raw_data =
            raw_data.ok_or_else(|| GatewayError::internal("transaction missing raw_data"))?;
        let tx_id = Bytes::from(tx_id);
        Ok(TransactionIntent {
            id: tx_id.clone(),
            payload_to_sign: tx_id,
            signature_type: self.eth.descriptor.signature_type.to_string(),
            raw_data: raw_data.get().as_bytes().to_vec().into(),
            estimated_fee: fee,
        })
    }

    pub(crate) async fn send_impl(&self, request: SendRequest) -> Result<SendResponse, GatewayError> {
        let raw_data = String::from_utf8(request.intent.raw_data.to_vec())
            .ok()
            .and_then(|raw| RawValue::from_string(raw).ok())
            .ok_or_else(|| {
                GatewayError::InvalidArgument("intent raw data is not a json document".to_string())
            })?;
        let signature = request
            .signatures
            .first()
            .ok_or_else(|| GatewayError::InvalidArgument("a signature is required".to_string()))?;

        let response = self
            .api
            .broadcast_transaction(&BroadcastTransactionRequest {
                visible: true,
                raw_data,
                signature: vec![hex::encode(signature)],
            })
            .await?;
        if !response.result {
            return Err(GatewayError::internal(format!(
                "broadcast failed: {}: {}",
                response.code.as_deref().unwrap_or("UNKNOWN"),
                response.message.as_deref().unwrap_or("")
            )));
        }
        Ok(SendResponse { id: request.intent.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandwidth_estimates() {
        // 200 hex chars = 100 raw bytes.
        assert_eq!(native_bandwidth(200), 100 + 64 + 67 + 3);
        assert_eq!(trc20_bandwidth(200), 100 + 134 + 6);
    }

    #[test]
    fn test_expiring_cache() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        assert!(cache.get().is_none());
        cache.set(FeePrices { bandwidth_price: 1000, energy_price: 420 });
        assert_eq!(cache.get().unwrap().bandwidth_price, 1000);

        let expired = ExpiringCache::new(Duration::ZERO);
        expired.set(7u64);
        assert!(expired.get().is_none());
    }
}

//! Currency resolution
//!
//! Native currencies resolve from the chain descriptor without any network
//! call. Fungible tokens are read from the contract (`symbol()` and
//! `decimals()`) and cached; contract-layer failures collapse into
//! `InvalidArgument` so callers never see transport detail.

use crate::eth::calls::{self, CallRequest};
use crate::eth::erc20;
use alloy_primitives::Address;
use dashmap::DashMap;
use omni_jsonrpc::RpcClient;
use omni_model::{ChainCurrencyId, ChainId, Currency, CurrencyId, GatewayError};
use tracing::{debug, warn};

/// Entries carry cost 1; insertions beyond this are rejected.
pub const CURRENCY_CACHE_CAPACITY: usize = 1000;

const LATEST_TAG: &str = "latest";

/// Bounded concurrent metadata cache. The backing map is striped-locked, so
/// readers never block each other; a full cache rejects new inserts instead
/// of evicting (token metadata is immutable, stale entries cannot exist).
pub struct CurrencyCache {
    entries: DashMap<String, Currency>,
    max_entries: usize,
}

impl CurrencyCache {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: DashMap::new(), max_entries }
    }

    pub fn get(&self, id: &str) -> Option<Currency> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    pub fn insert(&self, id: String, currency: Currency) -> bool {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, currency);
        true
    }
}

/// Resolves currency ids for one chain network.
pub struct CurrencyResolver {
    chain: ChainId,
    native_decimals: u32,
    address_from_string: fn(&str) -> Result<Address, GatewayError>,
    cache: CurrencyCache,
}

impl CurrencyResolver {
    pub fn new(
        chain: ChainId,
        native_decimals: u32,
        address_from_string: fn(&str) -> Result<Address, GatewayError>,
    ) -> Self {
        Self {
            chain,
            native_decimals,
            address_from_string,
            cache: CurrencyCache::new(CURRENCY_CACHE_CAPACITY),
        }
    }

    /// Accepts both the cross-chain form (`TYPE[:NETWORK[:ADDRESS[:TOKEN]]]`)
    /// and the chain-local tail (`ADDRESS[:TOKEN]`).
    pub fn parse_chain_currency(&self, id: &str) -> Result<ChainCurrencyId, GatewayError> {
        if let Ok(full) = id.parse::<CurrencyId>() {
            if full.chain == self.chain {
                return Ok(ChainCurrencyId { address: full.address, token: full.token });
            }
        }
        id.parse()
    }

    pub async fn resolve(
        &self,
        client: &dyn RpcClient,
        id: &str,
    ) -> Result<Currency, GatewayError> {
        let currency = self.parse_chain_currency(id)?;

        if currency.is_native() {
            return Ok(Currency {
                id: id.to_string(),
                symbol: self.chain.chain_type.clone(),
                decimals: self.native_decimals,
            });
        }
        if currency.is_multi_token() {
            return Err(GatewayError::Unimplemented(
                "multi-token currencies are not supported yet".to_string(),
            ));
        }

        if let Some(hit) = self.cache.get(id) {
            debug!(currency = id, "currency cache hit");
            return Ok(hit);
        }
        debug!(currency = id, "currency cache miss");

        let token = (self.address_from_string)(&currency.address).map_err(|err| {
            warn!(currency = id, error = %err, "invalid token address");
            GatewayError::invalid_currency(id)
        })?;

        let symbol = self.read_string(client, token, erc20::encode_symbol(), id).await?;
        let decimals = self.read_uint(client, token, erc20::encode_decimals(), id).await?;

        let resolved = Currency { id: id.to_string(), symbol, decimals };
        self.cache.insert(id.to_string(), resolved.clone());
        Ok(resolved)
    }

    async fn read_string(
        &self,
        client: &dyn RpcClient,
        token: Address,
        data: Vec<u8>,
        id: &str,
    ) -> Result<String, GatewayError> {
        let raw = self.contract_read(client, token, data, id).await?;
        erc20::decode_string(&raw).ok_or_else(|| GatewayError::invalid_currency(id))
    }

    async fn read_uint(
        &self,
        client: &dyn RpcClient,
        token: Address,
        data: Vec<u8>,
        id: &str,
    ) -> Result<u32, GatewayError> {
        let raw = self.contract_read(client, token, data, id).await?;
        let value = erc20::decode_uint(&raw).ok_or_else(|| GatewayError::invalid_currency(id))?;
        value.try_into().map_err(|_| GatewayError::invalid_currency(id))
    }

    async fn contract_read(
        &self,
        client: &dyn RpcClient,
        token: Address,
        data: Vec<u8>,
        id: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        let request =
            CallRequest { to: Some(token), data: Some(data.into()), ..Default::default() };
        let raw = calls::eth_call(&request, LATEST_TAG).call(client).await.map_err(|err| {
            warn!(currency = id, error = %err, "token contract read failed");
            GatewayError::invalid_currency(id)
        })?;
        Ok(raw.to_vec())
    }
}

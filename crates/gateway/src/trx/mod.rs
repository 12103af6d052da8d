//! Tron chain adapter
//!
//! Tron reuses the Ethereum adapter for blocks, logs and currency reads via
//! its JSON-RPC surface, and diverges in three places: the base58check
//! address codec, a 3-second finality slot, and transaction construction
//! and broadcast over the HTTP wallet API.

pub mod api;
mod construct;

use crate::adapter::{
    ChainAdapter, CreateTransferRequest, ListBlocksRequest, SendRequest, SendResponse,
    SignTransactionRequest,
};
use crate::config::ChainNetworkConfig;
use crate::eth::convert::FinalityPolicy;
use crate::eth::{EthAdapter, EthExtensions};
use alloy_primitives::{Address, B256};
use api::TronHttpApi;
use construct::{ExpiringCache, FeePrices, FEE_PRICES_TTL};
use omni_chains::ChainRegistry;
use omni_model::{
    Block, ChainId, ChainInfo, Currency, GatewayError, SignedTransaction, TransactionIntent,
};
use std::time::Duration;
use tokio::sync::mpsc;

fn tron_address_from_string(address: &str) -> Result<Address, GatewayError> {
    omni_chains::trx::address_from_base58(address)
        .map_err(|_| GatewayError::invalid_address(address))
}

fn tron_address_to_string(address: Address) -> String {
    omni_chains::trx::address_to_base58(&address)
}

/// Extension hooks making the Ethereum adapter speak Tron.
pub fn extensions() -> EthExtensions {
    EthExtensions {
        address_from_string: tron_address_from_string,
        address_to_string: tron_address_to_string,
        finality: FinalityPolicy::new(Duration::from_secs(3)),
    }
}

/// Adapter for one Tron network.
pub struct TrxAdapter {
    pub(crate) eth: EthAdapter,
    pub(crate) api: TronHttpApi,
    pub(crate) fee_cache: ExpiringCache<FeePrices>,
}

impl TrxAdapter {
    pub async fn init(
        registry: &ChainRegistry,
        chain: ChainId,
        config: ChainNetworkConfig,
    ) -> Result<Self, GatewayError> {
        let http_url = config.http_urls.first().cloned().ok_or_else(|| {
            GatewayError::InvalidArgument(format!("httpUrls is required for {chain}"))
        })?;
        let eth = EthAdapter::init_with_extensions(registry, chain, config, extensions()).await?;
        Ok(Self {
            eth,
            api: TronHttpApi::new(http_url),
            fee_cache: ExpiringCache::new(FEE_PRICES_TTL),
        })
    }

    pub fn close(&self) {
        self.eth.close();
    }
}

#[async_trait::async_trait]
impl ChainAdapter for TrxAdapter {
    fn chain_id(&self) -> &ChainId {
        self.eth.chain_id()
    }

    async fn get_chain(&self) -> Result<ChainInfo, GatewayError> {
        self.eth.get_chain().await
    }

    async fn get_block(&self, id: B256) -> Result<Block, GatewayError> {
        self.eth.get_block(id).await
    }

    async fn list_blocks(
        &self,
        request: ListBlocksRequest,
        tx: mpsc::Sender<Block>,
    ) -> Result<(), GatewayError> {
        self.eth.list_blocks(request, tx).await
    }

    async fn get_currency(&self, id: &str) -> Result<Currency, GatewayError> {
        self.eth.get_currency(id).await
    }

    async fn create_transfer(
        &self,
        request: CreateTransferRequest,
    ) -> Result<TransactionIntent, GatewayError> {
        self.create_transfer_impl(request).await
    }

    async fn sign_transaction(
        &self,
        request: SignTransactionRequest,
    ) -> Result<SignedTransaction, GatewayError> {
        self.eth.sign_transaction(request).await
    }

    async fn combine_transaction(
        &self,
        signed: SignedTransaction,
    ) -> Result<SignedTransaction, GatewayError> {
        Ok(signed)
    }

    async fn send(&self, request: SendRequest) -> Result<SendResponse, GatewayError> {
        self.send_impl(request).await
    }
}

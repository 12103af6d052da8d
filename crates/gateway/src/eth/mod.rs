//! Ethereum-family chain adapter
//!
//! Serves every Ethereum-compatible network (ETH, BNB, and Tron's
//! JSON-RPC surface) over the balanced client. Chain-specific quirks hang
//! off [`EthExtensions`]: the address codec and the finality slot.

pub mod calls;
mod construct;
pub mod convert;
pub mod currency;
pub mod erc20;
pub mod tx;
pub mod types;

use crate::adapter::{
    ChainAdapter, CreateTransferRequest, ListBlocksRequest, SendRequest, SendResponse,
    SignTransactionRequest,
};
use crate::config::ChainNetworkConfig;
use alloy_primitives::{Address, B256};
use convert::{BlockConverter, FinalityPolicy};
use currency::CurrencyResolver;
use omni_chains::{ChainDescriptor, ChainRegistry};
use omni_jsonrpc::{BalancedRpcClient, RpcBatch, RpcClientError};
use omni_model::{
    Block, ChainId, ChainInfo, ChainService, Currency, GatewayError, SignedTransaction,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Height below the tip considered final; advisory, clients use finality
/// tags for the real signal.
const FINALIZED_HEIGHT: u64 = 20;
const MS_PER_BLOCK: u64 = 3000;

/// Hooks tuning the behavior of different Ethereum-like chains.
#[derive(Clone, Copy)]
pub struct EthExtensions {
    pub address_from_string: fn(&str) -> Result<Address, GatewayError>,
    pub address_to_string: fn(Address) -> String,
    pub finality: FinalityPolicy,
}

impl Default for EthExtensions {
    fn default() -> Self {
        Self { address_from_string, address_to_string, finality: FinalityPolicy::default() }
    }
}

/// Canonical hex address parsing.
pub fn address_from_string(address: &str) -> Result<Address, GatewayError> {
    address.parse().map_err(GatewayError::invalid_address)
}

/// Checksummed hex formatting.
pub fn address_to_string(address: Address) -> String {
    address.to_checksum(None)
}

/// Adapter for one Ethereum-family network.
pub struct EthAdapter {
    pub(crate) chain: ChainId,
    pub(crate) config: ChainNetworkConfig,
    pub(crate) descriptor: ChainDescriptor,
    pub(crate) client: BalancedRpcClient,
    /// Numeric chain id reported by the node, used for EIP-155 signing.
    pub(crate) chain_ref: u64,
    pub(crate) ext: EthExtensions,
    pub(crate) currencies: CurrencyResolver,
}

impl EthAdapter {
    pub async fn init(
        registry: &ChainRegistry,
        chain: ChainId,
        config: ChainNetworkConfig,
    ) -> Result<Self, GatewayError> {
        Self::init_with_extensions(registry, chain, config, EthExtensions::default()).await
    }

    pub async fn init_with_extensions(
        registry: &ChainRegistry,
        chain: ChainId,
        config: ChainNetworkConfig,
        ext: EthExtensions,
    ) -> Result<Self, GatewayError> {
        let chain = chain.normalize();
        info!(chain = %chain, "connecting");

        let descriptor = registry
            .get(&chain.chain_type)
            .cloned()
            .ok_or_else(|| GatewayError::chain_not_supported(&chain))?;

        if config.rpc_urls.is_empty() {
            return Err(GatewayError::InvalidArgument(format!(
                "no rpc endpoints configured for {chain}"
            )));
        }
        for url in &config.rpc_urls {
            info!(chain = %chain, url = %url.url, limit_rps = url.limit_rps, "upstream");
        }

        let endpoints = config.rpc_urls.iter().cloned().map(Into::into).collect();
        let client = BalancedRpcClient::start(&chain.to_string(), endpoints)
            .await
            .map_err(GatewayError::internal)?;

        let chain_ref = calls::chain_id()
            .call(&client)
            .await
            .map_err(|err| GatewayError::unavailable(format!("failed to get chain id: {err}")))?;
        let chain_ref = u64::try_from(chain_ref)
            .map_err(|_| GatewayError::internal(format!("chain id out of range: {chain_ref}")))?;
        info!(chain = %chain, chain_ref, "connected");

        let currencies =
            CurrencyResolver::new(chain.clone(), descriptor.decimals, ext.address_from_string);

        let adapter = Self { chain, config, descriptor, client, chain_ref, ext, currencies };
        if tracing::enabled!(tracing::Level::DEBUG) {
            adapter.log_node_info().await;
        }
        Ok(adapter)
    }

    fn converter(&self) -> BlockConverter<'_> {
        BlockConverter {
            chain: self.chain.to_string(),
            client: &self.client,
            address_to_string: self.ext.address_to_string,
            finality: self.ext.finality,
        }
    }

    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            id: self.chain.clone(),
            bip44_id: self.descriptor.slip44,
            testnet: self.config.testnet,
            finalized_height: FINALIZED_HEIGHT,
            ms_per_block: MS_PER_BLOCK,
            supported_services: vec![
                ChainService::Block,
                ChainService::Construct,
                ChainService::Currencies,
            ],
        }
    }

    /// Batch probe of the auxiliary node endpoints, for the startup log.
    async fn log_node_info(&self) {
        let mut batch = RpcBatch::new();
        let version = batch.push(calls::client_version());
        let listening = batch.push(calls::net_listening());
        let syncing = batch.push(calls::syncing());
        let peer_count = batch.push(calls::net_peer_count());
        let net_version = batch.push(calls::net_version());
        if let Err(err) = batch.call(&self.client).await {
            debug!(error = %err, "node info probe failed");
            return;
        }
        debug!(
            version = ?version.resolve(&mut batch).ok(),
            listening = ?listening.resolve(&mut batch).ok(),
            syncing = ?syncing.resolve(&mut batch).ok(),
            peer_count = ?peer_count.resolve(&mut batch).ok(),
            net_version = ?net_version.resolve(&mut batch).ok(),
            "node info"
        );
    }

    pub(crate) async fn get_block_impl(&self, id: B256) -> Result<Block, GatewayError> {
        let block = calls::get_block_by_hash(id, true).call(&self.client).await.map_err(
            |err| match err {
                RpcClientError::NoResult => GatewayError::NotFound(format!("block {id}")),
                err => GatewayError::unavailable(format!("failed to get block: {err}")),
            },
        )?;
        let mut block = self.converter().convert(block).await?;
        // Header-only response.
        block.transactions.clear();
        Ok(block)
    }

    pub(crate) async fn list_blocks_impl(
        &self,
        request: ListBlocksRequest,
        tx: mpsc::Sender<Block>,
    ) -> Result<(), GatewayError> {
        convert::stream_blocks(&self.converter(), request, tx).await
    }

    pub fn close(&self) {
        self.client.close();
    }
}

#[async_trait::async_trait]
impl ChainAdapter for EthAdapter {
    fn chain_id(&self) -> &ChainId {
        &self.chain
    }

    async fn get_chain(&self) -> Result<ChainInfo, GatewayError> {
        Ok(self.chain_info())
    }

    async fn get_block(&self, id: B256) -> Result<Block, GatewayError> {
        self.get_block_impl(id).await
    }

    async fn list_blocks(
        &self,
        request: ListBlocksRequest,
        tx: mpsc::Sender<Block>,
    ) -> Result<(), GatewayError> {
        self.list_blocks_impl(request, tx).await
    }

    async fn get_currency(&self, id: &str) -> Result<Currency, GatewayError> {
        self.currencies.resolve(&self.client, id).await
    }

    async fn create_transfer(
        &self,
        request: CreateTransferRequest,
    ) -> Result<omni_model::TransactionIntent, GatewayError> {
        self.create_transfer_impl(request).await
    }

    async fn sign_transaction(
        &self,
        request: SignTransactionRequest,
    ) -> Result<SignedTransaction, GatewayError> {
        self.sign_impl(request)
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

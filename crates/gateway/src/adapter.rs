//! Chain adapter contract

use alloy_primitives::{Bytes, B256};
use omni_model::{
    Block, Currency, CurrencyAmount, ChainId, ChainInfo, FinalityStatus, GatewayError,
    SignedTransaction, TransactionIntent,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default block count of a `list_blocks` call when none is given.
pub const DEFAULT_LIST_BLOCKS_COUNT: u64 = 10;

/// Streaming block listing request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlocksRequest {
    pub start_number: u64,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub min_finality: FinalityStatus,
}

impl ListBlocksRequest {
    /// Requested count with the default applied; 0 means default too.
    pub fn effective_count(&self) -> u64 {
        match self.count {
            Some(0) | None => DEFAULT_LIST_BLOCKS_COUNT,
            Some(count) => count,
        }
    }
}

/// Transfer construction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub from: String,
    pub to: String,
    pub amount: CurrencyAmount,
}

/// Local-key signing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignTransactionRequest {
    pub intent: TransactionIntent,
    pub private_key: Bytes,
}

/// Broadcast request: the intent plus the signatures to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub intent: TransactionIntent,
    pub signatures: Vec<Bytes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub id: Bytes,
}

/// One chain network behind the gateway.
#[async_trait::async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain_id(&self) -> &ChainId;

    async fn get_chain(&self) -> Result<ChainInfo, GatewayError>;

    /// Block by hash; transactions are omitted from the response.
    async fn get_block(&self, id: B256) -> Result<Block, GatewayError>;

    /// Stream converted blocks into `tx`, stopping early once a block falls
    /// below the requested finality.
    async fn list_blocks(
        &self,
        request: ListBlocksRequest,
        tx: mpsc::Sender<Block>,
    ) -> Result<(), GatewayError>;

    async fn get_currency(&self, id: &str) -> Result<Currency, GatewayError>;

    async fn create_transfer(
        &self,
        request: CreateTransferRequest,
    ) -> Result<TransactionIntent, GatewayError>;

    async fn sign_transaction(
        &self,
        request: SignTransactionRequest,
    ) -> Result<SignedTransaction, GatewayError>;

    /// Attach signatures to an intent without touching its raw data.
    async fn combine_transaction(
        &self,
        signed: SignedTransaction,
    ) -> Result<SignedTransaction, GatewayError>;

    async fn send(&self, request: SendRequest) -> Result<SendResponse, GatewayError>;
}

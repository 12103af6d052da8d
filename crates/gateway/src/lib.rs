//! Omnigate chain gateway
//!
//! This crate holds the gateway core:
//! - per-chain adapters speaking the native upstream protocols
//!   (Ethereum-family JSON-RPC, Tron HTTP side channel)
//! - the block/transaction converter producing the canonical model
//! - the currency resolver with its bounded cache
//! - the transfer constructors (native and token transfers)
//! - the chain router and the HTTP facade in front of it

pub mod adapter;
pub mod config;
pub mod eth;
pub mod facade;
pub mod router;
pub mod trx;

pub use adapter::{
    ChainAdapter, CreateTransferRequest, ListBlocksRequest, SendRequest, SendResponse,
    SignTransactionRequest,
};
pub use config::{ChainNetworkConfig, ChainTypeConfig, ConfigError, GatewayConfig, RpcUrlConfig};
pub use facade::GatewayApi;
pub use router::ChainRouter;

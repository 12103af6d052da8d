//! Typed JSON-RPC client with batching
//!
//! - [`RpcCall`] pairs a raw request with a deferred decode stage; batch
//!   elements resolve independently so one malformed element never aborts
//!   the rest of the batch
//! - [`HttpRpcClient`] speaks JSON-RPC 2.0 over HTTP
//! - [`BalancedRpcClient`] routes calls through the upstream balancer and
//!   records per-upstream request metrics
//! - [`hexnum`] holds the lenient hex helpers for chains that return
//!   non-canonical fields

pub mod balanced;
pub mod call;
pub mod error;
pub mod hexnum;
pub mod http;

pub use balanced::{BalancedRpcClient, RpcDialer, RpcEndpoint, Upstream};
pub use call::{BatchSlot, RawCall, RpcBatch, RpcCall, RpcClient};
pub use error::RpcClientError;
pub use http::HttpRpcClient;

//! JSON-RPC client errors

use omni_balancer::BalancerError;
use thiserror::Error;

/// Error from a JSON-RPC call or batch element.
#[derive(Debug, Error)]
pub enum RpcClientError {
    /// HTTP-level failure; connection-error classification happens on the
    /// dialer, not here.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Error object returned by the server.
    #[error("json-rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// Response carried neither a result nor an error.
    #[error("rpc response has no result")]
    NoResult,
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid hex value: {0}")]
    InvalidHex(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no upstream")]
    NoUpstream,
}

impl From<BalancerError<RpcClientError>> for RpcClientError {
    fn from(err: BalancerError<RpcClientError>) -> Self {
        match err {
            BalancerError::NoUpstream => Self::NoUpstream,
            BalancerError::Upstream(err) => err,
        }
    }
}

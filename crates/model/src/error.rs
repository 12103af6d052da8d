//! Gateway error taxonomy
//!
//! Every public operation surfaces one of the standard codes; adapters attach
//! context messages at the failure site.

use std::fmt;
use thiserror::Error;

/// Error returned by gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("unimplemented: {0}")]
    Unimplemented(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid_currency(id: impl fmt::Display) -> Self {
        Self::InvalidArgument(format!("invalid currency id: {id}"))
    }

    pub fn invalid_chain_id(id: impl fmt::Display) -> Self {
        Self::InvalidArgument(format!("invalid chain id: {id}"))
    }

    pub fn invalid_address(err: impl fmt::Display) -> Self {
        Self::InvalidArgument(format!("invalid address: {err}"))
    }

    pub fn invalid_amount(err: impl fmt::Display) -> Self {
        Self::InvalidArgument(format!("invalid amount: {err}"))
    }

    pub fn block_out_of_range() -> Self {
        Self::OutOfRange("no more blocks".to_string())
    }

    pub fn chain_id_required() -> Self {
        Self::InvalidArgument("chain id is required".to_string())
    }

    pub fn chain_not_supported(id: impl fmt::Display) -> Self {
        Self::NotFound(format!("chain not supported: {id}"))
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn unavailable(err: impl fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    /// Stable code name for logs and wire responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::OutOfRange(_) => "OUT_OF_RANGE",
            Self::Unimplemented(_) => "UNIMPLEMENTED",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

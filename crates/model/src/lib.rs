//! Omnigate canonical data model
//!
//! Chain-agnostic types shared by every adapter:
//! - Chain and currency identifiers with their wire grammar
//! - Canonical blocks, transactions and transfers
//! - Transaction intents produced by the transfer constructors
//! - The gateway error taxonomy

pub mod block;
pub mod chain;
pub mod currency;
pub mod error;
pub mod intent;

pub use block::{Block, BlockHeader, CurrencyAmount, FinalityStatus, Transaction, Transfer, TransferStatus};
pub use chain::{ChainId, ChainInfo, ChainService, MAINNET};
pub use currency::{ChainCurrencyId, Currency, CurrencyId};
pub use error::GatewayError;
pub use intent::{SignedTransaction, TransactionIntent};

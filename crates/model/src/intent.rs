//! Transfer intents

use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

/// Unsigned transaction plus the exact payload a signer must sign.
///
/// Produced by a transfer constructor; opaque to the gateway afterwards and
/// consumed unchanged by `Send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIntent {
    /// Deterministic intent id, usually the signing digest.
    pub id: Bytes,
    /// 32-byte digest the signer must sign.
    pub payload_to_sign: Bytes,
    /// Signature scheme tag, e.g. `secp256k1`.
    pub signature_type: String,
    /// Serialized raw transaction the signature is later applied to.
    pub raw_data: Bytes,
    pub estimated_fee: U256,
}

/// Intent with signatures attached; `raw_data` stays untouched until `Send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub intent: TransactionIntent,
    pub signatures: Vec<Bytes>,
}

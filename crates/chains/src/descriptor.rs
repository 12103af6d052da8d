//! Chain descriptor type

use std::fmt;
use thiserror::Error;

/// Errors from key and signature operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("payload must be a 32-byte digest")]
    InvalidDigest,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("public key or private key is required")]
    MissingKey,
}

/// Generated or imported account key material.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub address: String,
    pub public_key: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl fmt::Debug for KeyPair {
    // Private key stays out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Immutable description of one chain family.
///
/// Behavior fields are plain function pointers; the concrete chains are the
/// variants, there is no type hierarchy behind this.
#[derive(Clone)]
pub struct ChainDescriptor {
    /// SLIP-44 coin code, e.g. `ETH`.
    pub code: &'static str,
    /// SLIP-44 coin number.
    pub slip44: u32,
    /// Native currency decimals.
    pub decimals: u32,
    /// Signature scheme tag, e.g. `secp256k1`.
    pub signature_type: &'static str,
    /// Sign a 32-byte digest with a private key.
    pub sign: fn(&[u8], &[u8]) -> Result<Vec<u8>, KeyError>,
    /// Verify a signature over a 32-byte digest against a public key.
    pub verify: fn(&[u8], &[u8], &[u8]) -> bool,
    /// Generate a fresh account offline.
    pub generate_keypair: fn() -> Result<KeyPair, KeyError>,
    /// Validate an address string.
    pub validate_address: fn(&str) -> bool,
    /// Recover the canonical address from a public and/or private key.
    pub address_from_keys: fn(Option<&[u8]>, Option<&[u8]>) -> Result<String, KeyError>,
    /// Derive the public key from a private key.
    pub public_from_private: fn(&[u8]) -> Result<Vec<u8>, KeyError>,
}

impl fmt::Debug for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainDescriptor")
            .field("code", &self.code)
            .field("slip44", &self.slip44)
            .field("decimals", &self.decimals)
            .field("signature_type", &self.signature_type)
            .finish_non_exhaustive()
    }
}

impl ChainDescriptor {
    /// Build a key pair from existing private key bytes.
    pub fn keypair_from_private(&self, private_key: &[u8]) -> Result<KeyPair, KeyError> {
        let public_key = (self.public_from_private)(private_key)?;
        let address = (self.address_from_keys)(Some(&public_key), Some(private_key))?;
        Ok(KeyPair { address, public_key, private_key: private_key.to_vec() })
    }
}

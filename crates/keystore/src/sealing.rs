//! Private key sealing
//!
//! Keys at rest are sealed with XChaCha20-Poly1305 under a per-record key
//! derived from the master key with Argon2 (3 passes, 32 MiB, parallelism 4,
//! 32-byte output). Ciphertext layout: `salt(16) ‖ nonce(24) ‖ ct‖tag`.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use thiserror::Error;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

const ARGON2_PASSES: u32 = 3;
const ARGON2_MEMORY_KIB: u32 = 32 * 1024;
const ARGON2_LANES: u32 = 4;

#[derive(Debug, Error)]
pub enum SealError {
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error("sealed payload is too short")]
    TooShort,
    #[error("failed to authenticate sealed payload")]
    Unauthentic,
}

/// Seals and opens private key material. An empty master key disables
/// sealing, which is only meant for tests and throwaway setups.
#[derive(Clone)]
pub enum Sealer {
    Plaintext,
    XChaCha20Poly1305 { master_key: Vec<u8> },
}

impl Sealer {
    pub fn new(master_key: &[u8]) -> Self {
        if master_key.is_empty() {
            Self::Plaintext
        } else {
            Self::XChaCha20Poly1305 { master_key: master_key.to_vec() }
        }
    }

    pub fn seal(&self, data: &[u8]) -> Result<Vec<u8>, SealError> {
        let master_key = match self {
            Self::Plaintext => return Ok(data.to_vec()),
            Self::XChaCha20Poly1305 { master_key } => master_key,
        };
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut nonce);

        let cipher = record_cipher(master_key, &salt)?;
        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), data)
            .map_err(|_| SealError::Unauthentic)?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, SealError> {
        let master_key = match self {
            Self::Plaintext => return Ok(data.to_vec()),
            Self::XChaCha20Poly1305 { master_key } => master_key,
        };
        if data.len() < SALT_LEN + NONCE_LEN + 1 {
            return Err(SealError::TooShort);
        }
        let (salt, rest) = data.split_at(SALT_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);

        let cipher = record_cipher(master_key, salt)?;
        cipher.decrypt(XNonce::from_slice(nonce), sealed).map_err(|_| SealError::Unauthentic)
    }
}

fn record_cipher(master_key: &[u8], salt: &[u8]) -> Result<XChaCha20Poly1305, SealError> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_PASSES, ARGON2_LANES, Some(KEY_LEN))
        .map_err(|err| SealError::Kdf(err.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2i, Version::V0x13, params);
    let mut key = [0u8; KEY_LEN];
    argon
        .hash_password_into(master_key, salt, &mut key)
        .map_err(|err| SealError::Kdf(err.to_string()))?;
    Ok(XChaCha20Poly1305::new(Key::from_slice(&key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_round_trip() {
        let sealer = Sealer::new(b"correct horse battery staple");
        for payload in [&b"k"[..], &[0u8; 32][..], &b"a longer private key payload"[..]] {
            let sealed = sealer.seal(payload).unwrap();
            assert_ne!(sealed, payload);
            assert_eq!(sealed.len(), SALT_LEN + NONCE_LEN + payload.len() + 16);
            assert_eq!(sealer.open(&sealed).unwrap(), payload);
        }
    }

    #[test]
    fn test_wrong_key_fails_to_authenticate() {
        let sealer = Sealer::new(b"master one");
        let other = Sealer::new(b"master two");
        let sealed = sealer.seal(b"secret").unwrap();
        assert!(matches!(other.open(&sealed), Err(SealError::Unauthentic)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let sealer = Sealer::new(b"master");
        let mut sealed = sealer.seal(b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(sealer.open(&sealed).is_err());
        assert!(matches!(sealer.open(&sealed[..10]), Err(SealError::TooShort)));
    }

    #[test]
    fn test_plaintext_sealer_passthrough() {
        let sealer = Sealer::new(b"");
        assert_eq!(sealer.seal(b"data").unwrap(), b"data");
        assert_eq!(sealer.open(b"data").unwrap(), b"data");
    }
}

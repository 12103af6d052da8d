//! Ethereum chain descriptor: secp256k1 recoverable signatures and
//! keccak-derived addresses.

use crate::descriptor::{ChainDescriptor, KeyError, KeyPair};
use alloy_primitives::{keccak256, Address};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};

pub const CODE: &str = "ETH";
pub const SLIP44: u32 = 60;
pub const DECIMALS: u32 = 18;
pub const SIGNATURE_TYPE: &str = "secp256k1";

/// Signature length: `r(32) ‖ s(32) ‖ v(1)`.
pub const SIGNATURE_LEN: usize = 65;

pub fn descriptor() -> ChainDescriptor {
    ChainDescriptor {
        code: CODE,
        slip44: SLIP44,
        decimals: DECIMALS,
        signature_type: SIGNATURE_TYPE,
        sign,
        verify,
        generate_keypair,
        validate_address,
        address_from_keys,
        public_from_private,
    }
}

fn digest_message(data: &[u8]) -> Result<Message, KeyError> {
    let digest: [u8; 32] = data.try_into().map_err(|_| KeyError::InvalidDigest)?;
    Ok(Message::from_digest(digest))
}

/// Sign a 32-byte digest, producing a 65-byte `r ‖ s ‖ v` signature.
pub fn sign(data: &[u8], private_key: &[u8]) -> Result<Vec<u8>, KeyError> {
    let sk = SecretKey::from_slice(private_key).map_err(|_| KeyError::InvalidPrivateKey)?;
    let msg = digest_message(data)?;
    let sig = SECP256K1.sign_ecdsa_recoverable(&msg, &sk);
    let (rec_id, compact) = sig.serialize_compact();
    let mut out = Vec::with_capacity(SIGNATURE_LEN);
    out.extend_from_slice(&compact);
    out.push(i32::from(rec_id) as u8);
    Ok(out)
}

/// Verify a 65-byte recoverable signature by recovering the signer key and
/// comparing it to the given public key.
pub fn verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(msg) = digest_message(data) else { return false };
    let Some(recovered) = recover(&msg, signature) else { return false };
    let Ok(expected) = PublicKey::from_slice(public_key) else { return false };
    recovered == expected
}

fn recover(msg: &Message, signature: &[u8]) -> Option<PublicKey> {
    if signature.len() != SIGNATURE_LEN {
        return None;
    }
    let rec_id = RecoveryId::try_from(signature[SIGNATURE_LEN - 1] as i32).ok()?;
    let sig = RecoverableSignature::from_compact(&signature[..64], rec_id).ok()?;
    SECP256K1.recover_ecdsa(msg, &sig).ok()
}

pub fn generate_keypair() -> Result<KeyPair, KeyError> {
    let (sk, pk) = SECP256K1.generate_keypair(&mut rand::thread_rng());
    let public_key = pk.serialize_uncompressed().to_vec();
    Ok(KeyPair {
        address: address_from_public_key(&public_key)?.to_checksum(None),
        public_key,
        private_key: sk.secret_bytes().to_vec(),
    })
}

pub fn public_from_private(private_key: &[u8]) -> Result<Vec<u8>, KeyError> {
    let sk = SecretKey::from_slice(private_key).map_err(|_| KeyError::InvalidPrivateKey)?;
    Ok(PublicKey::from_secret_key(SECP256K1, &sk).serialize_uncompressed().to_vec())
}

/// Keccak of the uncompressed public key body, low 20 bytes.
pub fn address_from_public_key(public_key: &[u8]) -> Result<Address, KeyError> {
    let pk = PublicKey::from_slice(public_key).map_err(|_| KeyError::InvalidPublicKey)?;
    let uncompressed = pk.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

pub fn address_from_keys(
    public_key: Option<&[u8]>,
    private_key: Option<&[u8]>,
) -> Result<String, KeyError> {
    let public_key = match public_key {
        Some(pk) => pk.to_vec(),
        None => public_from_private(private_key.ok_or(KeyError::MissingKey)?)?,
    };
    Ok(address_from_public_key(&public_key)?.to_checksum(None))
}

pub fn validate_address(address: &str) -> bool {
    address.parse::<Address>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC_KEY: [u8; 32] = [0x01; 32];

    #[test]
    fn test_static_key_address() {
        let addr = address_from_keys(None, Some(&STATIC_KEY)).unwrap();
        assert_eq!(addr, "0x1a642f0E3c3aF545E7AcBD38b07251B3990914F1");
        assert!(validate_address(&addr));
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let kp = generate_keypair().unwrap();
        let digest = keccak256(b"hello world");
        let sig = sign(digest.as_slice(), &kp.private_key).unwrap();
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(verify(digest.as_slice(), &sig, &kp.public_key));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let kp = generate_keypair().unwrap();
        let other = generate_keypair().unwrap();
        let digest = keccak256(b"payload");
        let sig = sign(digest.as_slice(), &kp.private_key).unwrap();
        assert!(!verify(digest.as_slice(), &sig, &other.public_key));
    }

    #[test]
    fn test_sign_requires_digest() {
        let kp = generate_keypair().unwrap();
        assert!(sign(b"too short", &kp.private_key).is_err());
    }
}

//! Tron chain descriptor: Ethereum key machinery with base58check addresses.

use crate::descriptor::{ChainDescriptor, KeyError, KeyPair};
use crate::eth;
use alloy_primitives::Address;
use sha2::{Digest, Sha256};

pub const CODE: &str = "TRX";
pub const SLIP44: u32 = 195;
pub const DECIMALS: u32 = 6;

/// Version byte prepended to the 20-byte account hash.
pub const ADDRESS_PREFIX: u8 = 0x41;

const RAW_ADDRESS_LEN: usize = 25;

pub fn descriptor() -> ChainDescriptor {
    ChainDescriptor {
        code: CODE,
        slip44: SLIP44,
        decimals: DECIMALS,
        signature_type: eth::SIGNATURE_TYPE,
        sign: eth::sign,
        verify: eth::verify,
        generate_keypair,
        validate_address,
        address_from_keys,
        public_from_private: eth::public_from_private,
    }
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// Base58check-encode a 20-byte account address.
pub fn address_to_base58(address: &Address) -> String {
    let mut raw = Vec::with_capacity(RAW_ADDRESS_LEN);
    raw.push(ADDRESS_PREFIX);
    raw.extend_from_slice(address.as_slice());
    let check = checksum(&raw);
    raw.extend_from_slice(&check);
    bs58::encode(raw).into_string()
}

/// Decode a base58check address back to its 20-byte account form.
pub fn address_from_base58(address: &str) -> Result<Address, KeyError> {
    let raw = bs58::decode(address).into_vec().map_err(|_| KeyError::InvalidPublicKey)?;
    if raw.len() != RAW_ADDRESS_LEN || raw[0] != ADDRESS_PREFIX {
        return Err(KeyError::InvalidPublicKey);
    }
    let (payload, check) = raw.split_at(RAW_ADDRESS_LEN - 4);
    if checksum(payload) != check {
        return Err(KeyError::InvalidPublicKey);
    }
    Ok(Address::from_slice(&payload[1..]))
}

pub fn generate_keypair() -> Result<KeyPair, KeyError> {
    let mut kp = eth::generate_keypair()?;
    kp.address = address_to_base58(&eth::address_from_public_key(&kp.public_key)?);
    Ok(kp)
}

pub fn address_from_keys(
    public_key: Option<&[u8]>,
    private_key: Option<&[u8]>,
) -> Result<String, KeyError> {
    let public_key = match public_key {
        Some(pk) => pk.to_vec(),
        None => eth::public_from_private(private_key.ok_or(KeyError::MissingKey)?)?,
    };
    Ok(address_to_base58(&eth::address_from_public_key(&public_key)?))
}

pub fn validate_address(address: &str) -> bool {
    address_from_base58(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC_KEY: [u8; 32] = [0x01; 32];

    #[test]
    fn test_static_key_address() {
        let addr = address_from_keys(None, Some(&STATIC_KEY)).unwrap();
        assert_eq!(addr, "TCNkawTmcQgYSU8nP8cHswT1QPjharxJr7");
        assert!(validate_address(&addr));
    }

    #[test]
    fn test_address_codec_round_trip() {
        let addr = eth::address_from_keys(None, Some(&STATIC_KEY)).unwrap();
        let addr: Address = addr.parse().unwrap();
        let encoded = address_to_base58(&addr);
        assert_eq!(address_from_base58(&encoded).unwrap(), addr);
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        // Flip the last character of a valid address.
        let addr = address_from_keys(None, Some(&STATIC_KEY)).unwrap();
        let mut bad = addr[..addr.len() - 1].to_string();
        bad.push(if addr.ends_with('7') { '8' } else { '7' });
        assert!(!validate_address(&bad));
        assert!(!validate_address("not-base58-0OIl"));
    }
}

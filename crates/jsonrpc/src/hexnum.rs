//! Lenient hex parsing for non-canonical chains
//!
//! Some Ethereum-compatible chains return hex fields in non-standard form:
//! a bare `0x` for zero, leading zeros after the prefix, 21-byte prefixed
//! addresses. The fixers below normalize such strings; the `lenient` serde
//! deserializers apply them before strict decoding.

use crate::error::RpcClientError;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer};

const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

fn has_hex_prefix(s: &str) -> bool {
    s.len() >= 2 && s.starts_with("0x")
}

/// `"0x"` → 32-byte zero hash.
pub fn fix_zero_hash(s: &str) -> String {
    if s == "0x" {
        ZERO_HASH.to_string()
    } else {
        s.to_string()
    }
}

/// `"0x"` → `"0x0"`.
pub fn fix_zero_uint(s: &str) -> String {
    if s == "0x" {
        "0x0".to_string()
    } else {
        s.to_string()
    }
}

/// `"0x0…0N"` → `"0xN"`; an all-zero tail collapses to `"0x0"`.
pub fn fix_strip_leading_zeros(s: &str) -> String {
    if has_hex_prefix(s) {
        fix_zero_uint(&format!("0x{}", s[2..].trim_start_matches('0')))
    } else {
        s.to_string()
    }
}

/// Parse a hex quantity, tolerating `"0x"` and leading zeros.
pub fn parse_u64(s: &str) -> Result<u64, RpcClientError> {
    let tail = s.strip_prefix("0x").unwrap_or(s);
    if tail.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(tail, 16).map_err(|_| RpcClientError::InvalidHex(s.to_string()))
}

/// Parse a 256-bit hex quantity, tolerating `"0x"` and leading zeros.
pub fn parse_u256(s: &str) -> Result<U256, RpcClientError> {
    let tail = s.strip_prefix("0x").unwrap_or(s);
    if tail.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(tail, 16).map_err(|_| RpcClientError::InvalidHex(s.to_string()))
}

/// Parse a 32-byte hash, tolerating `"0x"` and shortened values, which are
/// left-padded to 32 bytes.
pub fn parse_b256(s: &str) -> Result<B256, RpcClientError> {
    let fixed = fix_zero_hash(s);
    let tail = fixed.strip_prefix("0x").unwrap_or(&fixed);
    if tail.len() > 64 {
        return Err(RpcClientError::InvalidHex(s.to_string()));
    }
    let padded = format!("{tail:0>64}");
    let bytes = hex_decode(&padded, s)?;
    Ok(B256::from_slice(&bytes))
}

/// Parse a 20-byte address, also accepting the 21-byte `0x41`-prefixed form
/// Tron uses.
pub fn parse_address(s: &str) -> Result<Address, RpcClientError> {
    let tail = s.strip_prefix("0x").unwrap_or(s);
    match tail.len() {
        40 => Ok(Address::from_slice(&hex_decode(tail, s)?)),
        42 if tail.starts_with("41") => Ok(Address::from_slice(&hex_decode(&tail[2..], s)?)),
        _ => Err(RpcClientError::InvalidHex(s.to_string())),
    }
}

fn hex_decode(tail: &str, original: &str) -> Result<Vec<u8>, RpcClientError> {
    hex::decode(tail).map_err(|_| RpcClientError::InvalidHex(original.to_string()))
}

/// Format a quantity the canonical way: `0x`-prefixed, no leading zeros.
pub fn format_u64(value: u64) -> String {
    format!("0x{value:x}")
}

pub fn format_u256(value: U256) -> String {
    format!("0x{value:x}")
}

/// Serde deserializers built on the lenient parsers. `*_opt` variants accept
/// a missing or null field; the plain variants require presence but still
/// tolerate the shortened hex forms.
pub mod lenient {
    use super::*;

    pub fn u64<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
        let s = String::deserialize(de)?;
        parse_u64(&s).map_err(serde::de::Error::custom)
    }

    pub fn u64_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(de)? {
            Some(s) => parse_u64(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn u256<'de, D: Deserializer<'de>>(de: D) -> Result<U256, D::Error> {
        let s = String::deserialize(de)?;
        parse_u256(&s).map_err(serde::de::Error::custom)
    }

    pub fn u256_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<U256>, D::Error> {
        match Option::<String>::deserialize(de)? {
            Some(s) => parse_u256(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn b256<'de, D: Deserializer<'de>>(de: D) -> Result<B256, D::Error> {
        let s = String::deserialize(de)?;
        parse_b256(&s).map_err(serde::de::Error::custom)
    }

    pub fn b256_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<B256>, D::Error> {
        match Option::<String>::deserialize(de)? {
            Some(s) => parse_b256(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn address<'de, D: Deserializer<'de>>(de: D) -> Result<Address, D::Error> {
        let s = String::deserialize(de)?;
        parse_address(&s).map_err(serde::de::Error::custom)
    }

    pub fn address_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Address>, D::Error> {
        match Option::<String>::deserialize(de)? {
            Some(s) => parse_address(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_zero_hash() {
        assert_eq!(fix_zero_hash("0x"), ZERO_HASH);
        assert_eq!(fix_zero_hash("0x1234"), "0x1234");
    }

    #[test]
    fn test_fix_zero_uint() {
        assert_eq!(fix_zero_uint("0x"), "0x0");
        assert_eq!(fix_zero_uint("0x15"), "0x15");
    }

    #[test]
    fn test_fix_strip_leading_zeros() {
        assert_eq!(fix_strip_leading_zeros("0x000123"), "0x123");
        assert_eq!(fix_strip_leading_zeros("0x0000"), "0x0");
        assert_eq!(fix_strip_leading_zeros("0x"), "0x0");
        assert_eq!(fix_strip_leading_zeros("no-prefix"), "no-prefix");
    }

    #[test]
    fn test_parse_u64_lenient() {
        assert_eq!(parse_u64("0x").unwrap(), 0);
        assert_eq!(parse_u64("0x0").unwrap(), 0);
        assert_eq!(parse_u64("0x00ff").unwrap(), 255);
        assert!(parse_u64("0xzz").is_err());
    }

    #[test]
    fn test_parse_u256_lenient() {
        assert_eq!(parse_u256("0x").unwrap(), U256::ZERO);
        assert_eq!(parse_u256("0x64").unwrap(), U256::from(100));
    }

    #[test]
    fn test_parse_b256_pads_short_values() {
        let h = parse_b256("0x1").unwrap();
        assert_eq!(h, B256::with_last_byte(1));
        assert_eq!(parse_b256("0x").unwrap(), B256::ZERO);
        assert!(parse_b256(&format!("0x{}", "ab".repeat(33))).is_err());
    }

    #[test]
    fn test_parse_address_accepts_tron_prefix() {
        let plain = parse_address("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        let prefixed = parse_address("0x41dac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        assert_eq!(plain, prefixed);
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        assert_eq!(format_u64(255), "0xff");
        assert_eq!(parse_u64(&format_u64(12345)).unwrap(), 12345);
        assert_eq!(format_u256(U256::from(0)), "0x0");
    }
}

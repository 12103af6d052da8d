//! Minimal ERC-20 call encoding
//!
//! The gateway needs only three entry points: `transfer(address,uint256)`
//! calldata for constructed transfers, and `symbol()`/`decimals()` reads for
//! currency resolution.

use alloy_primitives::{keccak256, Address, U256};

const WORD: usize = 32;

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn left_pad_address(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(address.as_slice());
    word
}

/// `transfer(address,uint256)` calldata: selector ‖ pad32(to) ‖ pad32(amount).
pub fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&selector("transfer(address,uint256)"));
    data.extend_from_slice(&left_pad_address(to));
    data.extend_from_slice(&amount.to_be_bytes::<WORD>());
    data
}

pub fn encode_symbol() -> Vec<u8> {
    selector("symbol()").to_vec()
}

pub fn encode_decimals() -> Vec<u8> {
    selector("decimals()").to_vec()
}

/// Decode an ABI-encoded `string` return value.
pub fn decode_string(data: &[u8]) -> Option<String> {
    if data.len() < 2 * WORD {
        return None;
    }
    let offset: usize = U256::from_be_slice(&data[..WORD]).try_into().ok()?;
    let len_end = offset.checked_add(WORD)?;
    if data.len() < len_end {
        return None;
    }
    let len: usize = U256::from_be_slice(&data[offset..len_end]).try_into().ok()?;
    let bytes = data.get(len_end..len_end.checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Decode an ABI-encoded `uint8`/`uint256` return value.
pub fn decode_uint(data: &[u8]) -> Option<U256> {
    if data.len() != WORD {
        return None;
    }
    Some(U256::from_be_slice(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_transfer_calldata_layout() {
        let to = address!("1111111111111111111111111111111111111111");
        let data = encode_transfer(to, U256::from(100));
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], to.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(100));
    }

    #[test]
    fn test_read_selectors() {
        assert_eq!(encode_symbol(), vec![0x95, 0xd8, 0x9b, 0x41]);
        assert_eq!(encode_decimals(), vec![0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_decode_string_result() {
        // offset = 0x20, len = 4, "USDT"
        let mut data = vec![0u8; 64];
        data[31] = 0x20;
        data[63] = 4;
        data.extend_from_slice(b"USDT");
        data.extend_from_slice(&[0u8; 28]);
        assert_eq!(decode_string(&data).unwrap(), "USDT");
        assert!(decode_string(&data[..32]).is_none());
    }

    #[test]
    fn test_decode_uint_result() {
        let word = U256::from(6).to_be_bytes::<32>();
        assert_eq!(decode_uint(&word).unwrap(), U256::from(6));
        assert!(decode_uint(&word[..16]).is_none());
    }
}

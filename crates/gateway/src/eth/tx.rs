//! Legacy transaction codec
//!
//! Transfers are built as legacy transactions signed the EIP-155 way: the
//! signing digest covers `rlp([nonce, gasPrice, gas, to, value, data,
//! chainId, 0, 0])` and that same encoding is the intent's raw data. `Send`
//! later decodes it, applies the signature and re-encodes the signed form.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header as RlpHeader, EMPTY_STRING_CODE};
use omni_model::GatewayError;

/// Gas of a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Unsigned legacy transaction bound to one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

impl LegacyTransaction {
    /// EIP-155 signing payload: the nine-field RLP with the chain id and two
    /// zero placeholders in the signature slots.
    pub fn encode_unsigned(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode_base_fields(&mut payload);
        self.chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);
        wrap_list(payload)
    }

    /// Signed wire encoding with `v = 35 + 2·chain_id + parity`.
    pub fn encode_signed(&self, v: u64, r: U256, s: U256) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode_base_fields(&mut payload);
        v.encode(&mut payload);
        r.encode(&mut payload);
        s.encode(&mut payload);
        wrap_list(payload)
    }

    fn encode_base_fields(&self, out: &mut Vec<u8>) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match &self.to {
            Some(address) => address.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.data.encode(out);
    }

    /// Digest a signer must sign.
    pub fn signing_hash(&self) -> B256 {
        keccak256(self.encode_unsigned())
    }

    /// Parse the unsigned nine-field encoding back.
    pub fn decode_unsigned(mut buf: &[u8]) -> Result<Self, alloy_rlp::Error> {
        let buf = &mut buf;
        let header = RlpHeader::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let tx = Self {
            nonce: u64::decode(buf)?,
            gas_price: U256::decode(buf)?,
            gas_limit: u64::decode(buf)?,
            to: decode_to(buf)?,
            value: U256::decode(buf)?,
            data: Bytes::decode(buf)?,
            chain_id: u64::decode(buf)?,
        };
        let _ = u64::decode(buf)?;
        let _ = u64::decode(buf)?;
        Ok(tx)
    }

    /// Apply a 65-byte `r ‖ s ‖ parity` signature, producing the signed wire
    /// encoding ready for `eth_sendRawTransaction`.
    pub fn apply_signature(&self, signature: &[u8]) -> Result<Vec<u8>, GatewayError> {
        if signature.len() != 65 {
            return Err(GatewayError::InvalidArgument(format!(
                "signature must be 65 bytes, got {}",
                signature.len()
            )));
        }
        let r = U256::from_be_slice(&signature[..32]);
        let s = U256::from_be_slice(&signature[32..64]);
        let v = 35 + 2 * self.chain_id + u64::from(signature[64]);
        Ok(self.encode_signed(v, r, s))
    }
}

fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    RlpHeader { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

fn decode_to(buf: &mut &[u8]) -> Result<Option<Address>, alloy_rlp::Error> {
    if buf.first() == Some(&EMPTY_STRING_CODE) {
        *buf = &buf[1..];
        Ok(None)
    } else {
        Ok(Some(Address::decode(buf)?))
    }
}

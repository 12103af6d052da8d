//! BNB Smart Chain descriptor: Ethereum behaviors under its own coin code.

use crate::descriptor::ChainDescriptor;
use crate::eth;

pub const CODE: &str = "BNB";
pub const SLIP44: u32 = 714;

pub fn descriptor() -> ChainDescriptor {
    ChainDescriptor { code: CODE, slip44: SLIP44, ..eth::descriptor() }
}

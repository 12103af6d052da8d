//! Chain descriptor registry
//!
//! Each supported chain family is described by a [`ChainDescriptor`]: its
//! code, SLIP-44 id, native decimals and a small fixed set of key/signature
//! behaviors. Descriptors are registered into an explicit [`ChainRegistry`]
//! built at startup; lookups are read-only.

pub mod bnb;
pub mod descriptor;
pub mod eth;
pub mod registry;
pub mod trx;

pub use descriptor::{ChainDescriptor, KeyError, KeyPair};
pub use registry::ChainRegistry;

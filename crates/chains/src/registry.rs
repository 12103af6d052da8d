//! Process chain registry
//!
//! Built once at startup and passed into the router and adapters; lookups
//! never mutate. An unknown code means "unsupported chain" for the caller.

use crate::descriptor::ChainDescriptor;
use crate::{bnb, eth, trx};
use std::collections::HashMap;

/// Registry of chain descriptors keyed by coin code.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<&'static str, ChainDescriptor>,
}

impl ChainRegistry {
    /// Empty registry; use [`ChainRegistry::default`] for the built-in set.
    pub fn new() -> Self {
        Self { chains: HashMap::new() }
    }

    pub fn register(&mut self, descriptor: ChainDescriptor) {
        self.chains.insert(descriptor.code, descriptor);
    }

    pub fn get(&self, code: &str) -> Option<&ChainDescriptor> {
        self.chains.get(code)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<_> = self.chains.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(eth::descriptor());
        registry.register(bnb::descriptor());
        registry.register(trx::descriptor());
        registry
    }
}

//! Chain router
//!
//! Maps canonical `TYPE:NETWORK` strings to their adapter. Every inbound
//! request names its chain; `list_chains` fans out to all of them.

use crate::adapter::ChainAdapter;
use omni_model::{ChainId, ChainInfo, GatewayError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct ChainRouter {
    adapters: BTreeMap<String, Arc<dyn ChainAdapter>>,
}

impl ChainRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, adapter: Arc<dyn ChainAdapter>) {
        self.adapters.insert(adapter.chain_id().to_string(), adapter);
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Adapter for a chain id string; normalizes before lookup.
    pub fn get(&self, chain_id: &str) -> Result<&Arc<dyn ChainAdapter>, GatewayError> {
        if chain_id.is_empty() {
            return Err(GatewayError::chain_id_required());
        }
        let id: ChainId = chain_id.parse()?;
        debug!(chain = %id, "route");
        self.adapters
            .get(&id.to_string())
            .ok_or_else(|| GatewayError::chain_not_supported(&id))
    }

    /// Chain descriptions of every registered adapter.
    pub async fn list_chains(&self) -> Result<Vec<ChainInfo>, GatewayError> {
        let mut chains = Vec::with_capacity(self.adapters.len());
        for adapter in self.adapters.values() {
            chains.push(adapter.get_chain().await?);
        }
        Ok(chains)
    }
}

//! Account persistence
//!
//! The SQL backing of production deployments lives behind [`AccountStore`];
//! the in-memory implementation serves the daemon default and the tests.

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Backend(String),
}

/// Persisted account row; the private key is sealed before it gets here.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub name: Option<String>,
    pub chain_type: String,
    pub address: String,
    pub public_key: Vec<u8>,
    pub sealed_key: Vec<u8>,
}

pub trait AccountStore: Send + Sync {
    fn save(&self, record: AccountRecord) -> Result<(), StoreError>;
    fn find_by_address(&self, address: &str) -> Result<Option<AccountRecord>, StoreError>;
    fn find_by_name(&self, name: &str) -> Result<Option<AccountRecord>, StoreError>;
    fn list(&self, name_prefix: &str) -> Result<Vec<AccountRecord>, StoreError>;
}

/// Volatile store keyed by address.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AccountRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryStore {
    fn save(&self, record: AccountRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if let Some(existing) = records.iter_mut().find(|r| r.address == record.address) {
            *existing = record;
        } else {
            records.push(record);
        }
        Ok(())
    }

    fn find_by_address(&self, address: &str) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.records.read().iter().find(|r| r.address == address).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.records.read().iter().find(|r| r.name.as_deref() == Some(name)).cloned())
    }

    fn list(&self, name_prefix: &str) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.name.as_deref().is_some_and(|n| n.starts_with(name_prefix)))
            .cloned()
            .collect())
    }
}

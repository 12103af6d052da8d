//! Account manager
//!
//! Stores sealed private keys and signs payloads on behalf of clients:
//! - [`Sealer`]: Argon2-keyed XChaCha20-Poly1305 sealing of key material
//! - [`AccountStore`]: persistence seam with an in-memory default
//! - [`KeyStore`]: create/get/list/sign service over a chain registry

pub mod sealing;
pub mod store;

pub use sealing::{SealError, Sealer};
pub use store::{AccountRecord, AccountStore, MemoryStore, StoreError};

use omni_chains::{ChainRegistry, KeyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("unsupported chain type: {0}")]
    UnknownChain(String),
    #[error("account not found")]
    AccountNotFound,
    #[error("either name or address is required")]
    SelectorRequired,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Seal(#[from] SealError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Account lookup key: by name when set, by address otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSelector {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Public view of a stored account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub address: String,
    pub name: Option<String>,
    pub public_key: Vec<u8>,
}

/// Name/address pair returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub name: String,
    pub address: String,
}

/// Account manager service.
pub struct KeyStore<S: AccountStore> {
    registry: ChainRegistry,
    store: S,
    sealer: Sealer,
}

impl<S: AccountStore> KeyStore<S> {
    pub fn new(registry: ChainRegistry, store: S, sealer: Sealer) -> Self {
        Self { registry, store, sealer }
    }

    /// Create an account: generate a key pair, or import `private_key` when
    /// supplied. The private key is sealed before it is persisted.
    pub fn create_account(
        &self,
        chain_type: &str,
        name: Option<String>,
        private_key: Option<&[u8]>,
    ) -> Result<AccountInfo, KeyStoreError> {
        let chain = self
            .registry
            .get(chain_type)
            .ok_or_else(|| KeyStoreError::UnknownChain(chain_type.to_string()))?;
        let keypair = match private_key {
            Some(key) => chain.keypair_from_private(key)?,
            None => (chain.generate_keypair)()?,
        };
        let sealed_key = self.sealer.seal(&keypair.private_key)?;
        self.store.save(AccountRecord {
            name: name.clone(),
            chain_type: chain_type.to_string(),
            address: keypair.address.clone(),
            public_key: keypair.public_key.clone(),
            sealed_key,
        })?;
        info!(chain = chain_type, address = %keypair.address, "account created");
        Ok(AccountInfo { address: keypair.address, name, public_key: keypair.public_key })
    }

    pub fn get_account(
        &self,
        selector: &AccountSelector,
    ) -> Result<Option<AccountInfo>, KeyStoreError> {
        Ok(self.find(selector)?.map(|record| AccountInfo {
            address: record.address,
            name: record.name,
            public_key: record.public_key,
        }))
    }

    /// Accounts whose name starts with `name_prefix`; unnamed accounts are
    /// never listed.
    pub fn list_accounts(&self, name_prefix: &str) -> Result<Vec<AccountSummary>, KeyStoreError> {
        Ok(self
            .store
            .list(name_prefix)?
            .into_iter()
            .filter_map(|record| {
                record.name.map(|name| AccountSummary { name, address: record.address })
            })
            .collect())
    }

    /// Sign `data` (a 32-byte digest) with the account's unsealed key.
    pub fn sign(
        &self,
        chain_type: &str,
        selector: &AccountSelector,
        data: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError> {
        let chain = self
            .registry
            .get(chain_type)
            .ok_or_else(|| KeyStoreError::UnknownChain(chain_type.to_string()))?;
        let record = self.find(selector)?.ok_or(KeyStoreError::AccountNotFound)?;
        let private_key = self.sealer.open(&record.sealed_key)?;
        Ok((chain.sign)(data, &private_key)?)
    }

    fn find(&self, selector: &AccountSelector) -> Result<Option<AccountRecord>, KeyStoreError> {
        match (&selector.name, &selector.address) {
            (Some(name), _) => Ok(self.store.find_by_name(name)?),
            (None, Some(address)) => Ok(self.store.find_by_address(address)?),
            (None, None) => Err(KeyStoreError::SelectorRequired),
        }
    }
}

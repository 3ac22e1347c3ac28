//! In-memory store backend.
//!
//! Ephemeral: nothing survives the process. Used by tests and by hosts
//! that cannot persist (the engine behaves identically, it just starts
//! cold on every launch).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::http::{CacheKey, Response};
use crate::store::{CacheStorage, Store};

/// In-memory [`CacheStorage`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error> {
        let mut stores = self.stores.write().await;
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::default()))
            .clone();
        Ok(store)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        Ok(stores.remove(name).is_some())
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// One named in-memory store.
#[derive(Debug, Default)]
struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, Response>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        entries.insert(key.clone(), response.clone());
        Ok(())
    }
}

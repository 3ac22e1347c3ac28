//! Versioned, named cache stores.
//!
//! A [`CacheStorage`] holds any number of named stores; each deployment
//! generation gets its own name (`<app-id>-<version>`) and stale
//! generations are deleted wholesale at activation. Two backends:
//!
//! - [`MemoryStorage`] — ephemeral, used in tests and short-lived hosts
//! - [`SqliteStorage`] — durable per origin across restarts, WAL mode
//!
//! `lookup` and `put` are individually atomic. Concurrent writes to the
//! same key resolve last-write-wins; there is no entry-level versioning.

pub mod key;
pub mod memory;
mod migrations;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::http::{CacheKey, Response};

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Handle to one named store inside a [`CacheStorage`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up the stored response for a key. `None` on miss.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, Error>;

    /// Insert or overwrite the entry for a key.
    ///
    /// Callers are responsible for only writing cacheable responses; the
    /// store itself does not inspect the status.
    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), Error>;
}

/// The cache store capability: named stores scoped per origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error>;

    /// Delete a store and all of its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of every store currently present, sorted.
    async fn list_names(&self) -> Result<Vec<String>, Error>;
}

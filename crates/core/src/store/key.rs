//! Content-addressed row keys for the SQLite backend.

use sha2::{Digest, Sha256};

use crate::http::CacheKey;

/// Compute the row key for a cache entry.
///
/// Method and URL are hashed together so `GET` and `HEAD` of the same URL
/// occupy distinct rows.
pub fn entry_hash(key: &CacheKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.method.as_bytes());
    hasher.update(b"\n");
    hasher.update(key.url.as_bytes());
    hex::encode(hasher.finalize())
}

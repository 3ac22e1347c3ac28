//! The three fetch/cache strategies.
//!
//! Shared rules: only status-200 responses are ever written to a store;
//! a completed non-200 response is returned to the caller uncached; a
//! transport failure is an `Err` and each strategy decides what to do
//! with it. Concurrent writes to the same key are last-write-wins.

use std::sync::Arc;

use intercache_client::Network;
use intercache_core::{Error, Request, Response, Store};

use crate::tasks::TaskQueue;

/// Cache-first with background refresh.
///
/// On a hit the cached response is returned immediately — no network
/// round-trip on the caller's path — and a refresh of the same key is
/// detached onto the task queue; its failures are swallowed. On a miss
/// this degrades to fetch, store if 200, return.
pub async fn stale_while_revalidate(
    store: Arc<dyn Store>,
    network: Arc<dyn Network>,
    tasks: &Arc<TaskQueue>,
    request: &Request,
) -> Result<Response, Error> {
    let key = request.cache_key();

    if let Some(cached) = store.lookup(&key).await? {
        tracing::debug!("cache hit for {key}, refreshing in background");
        let request = request.clone();
        tasks.spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    if let Err(e) = store.put(&request.cache_key(), &response).await {
                        tracing::warn!("background refresh of {} could not be stored: {e}", request.url);
                    }
                }
                Ok(response) => {
                    tracing::debug!("background refresh of {} got status {}, not cached", request.url, response.status);
                }
                Err(e) => {
                    // The cached response has already been returned;
                    // nothing to do but note the failure.
                    tracing::debug!("background refresh of {} failed: {e}", request.url);
                }
            }
        });
        return Ok(cached);
    }

    let response = network.fetch(request).await?;
    if response.is_cacheable() {
        store.put(&key, &response).await?;
    }
    Ok(response)
}

/// Network-first with cache fallback.
///
/// A fresh 200 is stored and returned. A completed non-200 is returned
/// uncached without consulting the cache. Only a transport failure falls
/// back to the store; if that also misses, the original network error
/// propagates.
pub async fn network_first(
    store: Arc<dyn Store>,
    network: Arc<dyn Network>,
    request: &Request,
) -> Result<Response, Error> {
    let key = request.cache_key();

    match network.fetch(request).await {
        Ok(response) => {
            if response.is_cacheable() {
                store.put(&key, &response).await?;
            }
            Ok(response)
        }
        Err(err) => {
            tracing::debug!("network failed for {key}, falling back to cache: {err}");
            match store.lookup(&key).await? {
                Some(cached) => Ok(cached),
                None => Err(err),
            }
        }
    }
}

/// Cache-first with network fallback.
///
/// A hit returns immediately with no background refresh. A miss fetches;
/// a 200 is stored and returned, a transport failure propagates.
pub async fn cache_first(
    store: Arc<dyn Store>,
    network: Arc<dyn Network>,
    request: &Request,
) -> Result<Response, Error> {
    let key = request.cache_key();

    if let Some(cached) = store.lookup(&key).await? {
        tracing::debug!("cache hit for {key}");
        return Ok(cached);
    }

    let response = network.fetch(request).await?;
    if response.is_cacheable() {
        store.put(&key, &response).await?;
    }
    Ok(response)
}

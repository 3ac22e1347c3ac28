//! Bulk precache: externally triggered cache warm-up.
//!
//! The hosting page posts a batch of URLs; each one is fetched and, if it
//! answers 200, written into the current store. Every URL is independent,
//! all work is detached, all failures are swallowed, and nothing is sent
//! back — there is no acknowledgment protocol.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use intercache_client::Network;
use intercache_core::{Request, Store};

use crate::tasks::TaskQueue;

/// Messages accepted from the hosting page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Warm the current store with a batch of URLs, best effort.
    #[serde(rename = "PRECACHE_URLS")]
    PrecacheUrls {
        /// URLs to fetch and store, each independently. Relative paths
        /// are resolved against the controlling origin.
        urls: Vec<String>,
    },
}

/// Detach one fetch-and-store task per URL and return immediately.
///
/// URLs that do not resolve are skipped; fetch failures and non-200
/// answers are logged and discarded.
pub fn precache(store: Arc<dyn Store>, network: Arc<dyn Network>, tasks: &Arc<TaskQueue>, origin: &Url, urls: Vec<String>) {
    tracing::debug!("precaching {} urls", urls.len());

    for raw in urls {
        let url = match origin.join(&raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("skipping precache of {raw}: {e}");
                continue;
            }
        };

        let store = Arc::clone(&store);
        let network = Arc::clone(&network);
        tasks.spawn(async move {
            let request = Request::get(url);
            match network.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    if let Err(e) = store.put(&request.cache_key(), &response).await {
                        tracing::warn!("precache of {} could not be stored: {e}", request.url);
                    }
                }
                Ok(response) => {
                    tracing::debug!("precache of {} got status {}, skipped", request.url, response.status);
                }
                Err(e) => {
                    tracing::debug!("precache of {} failed: {e}", request.url);
                }
            }
        });
    }
}

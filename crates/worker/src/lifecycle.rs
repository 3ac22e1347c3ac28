//! Install and activate phases.
//!
//! Install seeds the current generation's store with the critical assets
//! as one all-or-nothing batch, then signals skip-waiting. Activate
//! deletes every stale generation (each deletion independent) and then
//! claims the open clients regardless of deletion failures.

use std::sync::Arc;

use url::Url;

use intercache_client::Network;
use intercache_core::{CacheStorage, Error, Request};

use crate::host::HostControl;

/// Seed the current generation with the critical assets.
///
/// Every asset is fetched first; only when all of them answered 200 are
/// they written, so a failed install leaves no partially-seeded store
/// behind. Any fetch failure or non-200 aborts install — the hosting
/// environment retries installation later — and skip-waiting is only
/// signalled on success.
pub async fn install(
    storage: &Arc<dyn CacheStorage>,
    network: &Arc<dyn Network>,
    host: &Arc<dyn HostControl>,
    origin: &Url,
    cache_name: &str,
    critical_assets: &[String],
) -> Result<(), Error> {
    tracing::info!("installing generation {cache_name}");
    let store = storage.open(cache_name).await?;

    let mut fetched = Vec::with_capacity(critical_assets.len());
    for asset in critical_assets {
        let url = origin
            .join(asset)
            .map_err(|e| Error::InvalidUrl(format!("critical asset {asset}: {e}")))?;
        let request = Request::get(url);
        let response = network.fetch(&request).await?;
        if !response.is_cacheable() {
            return Err(Error::HttpStatus { url: request.url.to_string(), status: response.status });
        }
        fetched.push((request.cache_key(), response));
    }

    for (key, response) in &fetched {
        store.put(key, response).await?;
    }

    host.skip_waiting().await?;
    tracing::info!("installed generation {cache_name} with {} critical assets", critical_assets.len());
    Ok(())
}

/// Delete every generation except the current one, then claim clients.
///
/// Deletions are independent: one failure is logged and the rest still
/// run, and clients are claimed either way so the new policy applies to
/// already-open pages.
pub async fn activate(
    storage: &Arc<dyn CacheStorage>,
    host: &Arc<dyn HostControl>,
    cache_name: &str,
) -> Result<(), Error> {
    tracing::info!("activating generation {cache_name}");

    for name in storage.list_names().await? {
        if name == cache_name {
            continue;
        }
        match storage.delete(&name).await {
            Ok(true) => tracing::info!("deleted stale generation {name}"),
            Ok(false) => tracing::debug!("stale generation {name} already gone"),
            Err(e) => tracing::warn!("failed to delete stale generation {name}: {e}"),
        }
    }

    host.claim_clients().await?;
    tracing::info!("activated generation {cache_name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeNetwork, RecordingHost};
    use async_trait::async_trait;
    use intercache_core::{CacheKey, MemoryStorage, Response, Store};

    const ORIGIN: &str = "https://example.com";

    fn assets() -> Vec<String> {
        vec!["/".into(), "/page.html".into(), "/img/a.webp".into()]
    }

    fn script_all(network: &FakeNetwork) {
        network.respond("https://example.com/", Response::new(200, "root"));
        network.respond("https://example.com/page.html", Response::new(200, "<html>"));
        network.respond("https://example.com/img/a.webp", Response::new(200, "img"));
    }

    #[tokio::test]
    async fn test_install_seeds_all_assets_and_skips_waiting() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let host = Arc::new(RecordingHost::new());
        script_all(&network);

        let net: Arc<dyn Network> = network.clone();
        let hst: Arc<dyn HostControl> = host.clone();
        let origin = Url::parse(ORIGIN).unwrap();
        install(&storage, &net, &hst, &origin, "app-v1", &assets()).await.unwrap();

        let store = storage.open("app-v1").await.unwrap();
        for url in ["https://example.com/", "https://example.com/page.html", "https://example.com/img/a.webp"] {
            assert!(store.lookup(&CacheKey::new("GET", url)).await.unwrap().is_some(), "{url} missing");
        }
        assert_eq!(host.skip_waiting_calls(), 1);
    }

    #[tokio::test]
    async fn test_install_aborts_on_any_fetch_failure() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let host = Arc::new(RecordingHost::new());
        network.respond("https://example.com/", Response::new(200, "root"));
        network.fail("https://example.com/page.html");
        network.respond("https://example.com/img/a.webp", Response::new(200, "img"));

        let net: Arc<dyn Network> = network.clone();
        let hst: Arc<dyn HostControl> = host.clone();
        let origin = Url::parse(ORIGIN).unwrap();
        let result = install(&storage, &net, &hst, &origin, "app-v1", &assets()).await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(host.skip_waiting_calls(), 0);

        // No partial seed: even the asset that fetched fine is absent.
        let store = storage.open("app-v1").await.unwrap();
        assert!(store.lookup(&CacheKey::new("GET", "https://example.com/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_install_aborts_on_non_200_asset() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let host = Arc::new(RecordingHost::new());
        script_all(&network);
        network.respond("https://example.com/img/a.webp", Response::new(404, "gone"));

        let net: Arc<dyn Network> = network.clone();
        let hst: Arc<dyn HostControl> = host.clone();
        let origin = Url::parse(ORIGIN).unwrap();
        let result = install(&storage, &net, &hst, &origin, "app-v1", &assets()).await;

        assert!(matches!(result, Err(Error::HttpStatus { status: 404, .. })));
        assert_eq!(host.skip_waiting_calls(), 0);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_generations_and_claims() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        storage.open("app-v1").await.unwrap();
        storage.open("app-v2").await.unwrap();
        storage.open("app-v3").await.unwrap();
        let host = Arc::new(RecordingHost::new());

        let hst: Arc<dyn HostControl> = host.clone();
        activate(&storage, &hst, "app-v3").await.unwrap();

        assert_eq!(storage.list_names().await.unwrap(), vec!["app-v3"]);
        assert_eq!(host.claim_clients_calls(), 1);
    }

    /// Storage whose deletes always fail, for the independence guarantee.
    struct UndeletableStorage(MemoryStorage);

    #[async_trait]
    impl CacheStorage for UndeletableStorage {
        async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error> {
            self.0.open(name).await
        }

        async fn delete(&self, _name: &str) -> Result<bool, Error> {
            Err(Error::Store("delete refused".into()))
        }

        async fn list_names(&self) -> Result<Vec<String>, Error> {
            self.0.list_names().await
        }
    }

    #[tokio::test]
    async fn test_activate_claims_even_when_deletions_fail() {
        let inner = MemoryStorage::new();
        let storage: Arc<dyn CacheStorage> = Arc::new(UndeletableStorage(inner));
        storage.open("app-v1").await.unwrap();
        storage.open("app-v2").await.unwrap();
        let host = Arc::new(RecordingHost::new());

        let hst: Arc<dyn HostControl> = host.clone();
        activate(&storage, &hst, "app-v2").await.unwrap();

        assert_eq!(host.claim_clients_calls(), 1);
    }

    #[tokio::test]
    async fn test_install_with_no_assets_still_skips_waiting() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let host = Arc::new(RecordingHost::new());

        let net: Arc<dyn Network> = network.clone();
        let hst: Arc<dyn HostControl> = host.clone();
        let origin = Url::parse(ORIGIN).unwrap();
        install(&storage, &net, &hst, &origin, "app-v1", &[]).await.unwrap();

        assert_eq!(host.skip_waiting_calls(), 1);
        assert_eq!(storage.list_names().await.unwrap(), vec!["app-v1"]);
    }
}

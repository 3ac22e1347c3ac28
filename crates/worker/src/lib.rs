//! Request-interception policy engine.
//!
//! The worker sits between a web application and the network and decides,
//! per intercepted request, whether to answer from a versioned cache
//! store, from the network, or from one with the other as fallback.
//!
//! ```text
//! host events            Worker
//! ───────────            ──────
//! install     ──────▶  seed critical assets, skip waiting
//! activate    ──────▶  delete stale generations, claim clients
//! fetch(req)  ──────▶  cross-origin? bypass
//!                      └─ routing table ─▶ strategy ─▶ response
//! message     ──────▶  bulk precache (detached, best effort)
//! ```
//!
//! All state the engine needs — origin, generation name, asset list,
//! routing table — is parsed once from [`AppConfig`] at construction and
//! held immutably; the storage, network, and host-control capabilities
//! come in as trait objects.

pub mod host;
pub mod lifecycle;
pub mod precache;
pub mod routes;
pub mod strategy;
pub mod tasks;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use url::Url;

use intercache_client::{Network, canonicalize, same_origin};
use intercache_core::{AppConfig, CacheStorage, Error, Request, Response};

pub use host::{HostControl, NoopHost};
pub use precache::Message;
pub use routes::{Predicate, Route, RoutingTable, StrategyKind};
pub use tasks::TaskQueue;

/// Outcome of an interception decision.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted: the request must proceed through the default
    /// network path untouched. Cross-origin requests always take this.
    Bypass,
    /// The engine produced a response, from cache or network.
    Response(Response),
}

/// Immutable engine view of the configuration, parsed once at startup.
#[derive(Debug, Clone)]
struct WorkerConfig {
    origin: Url,
    cache_name: String,
    critical_assets: Vec<String>,
}

/// The policy engine. One logical instance per origin.
pub struct Worker {
    config: WorkerConfig,
    routes: RoutingTable,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn HostControl>,
    tasks: Arc<TaskQueue>,
}

impl Worker {
    /// Build a worker from configuration and capabilities.
    ///
    /// The configured origin is canonicalized (scheme defaulted, host
    /// lowercased, fragment stripped) before it is compared against
    /// intercepted requests.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the configured origin cannot be
    /// canonicalized into an absolute http(s) URL.
    pub fn new(
        config: &AppConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        host: Arc<dyn HostControl>,
    ) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin)
            .map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", config.origin)))?;

        Ok(Self {
            config: WorkerConfig {
                origin,
                cache_name: config.cache_name(),
                critical_assets: config.critical_assets.clone(),
            },
            routes: RoutingTable::new(config.image_extensions.clone(), config.document_extensions.clone()),
            storage,
            network,
            host,
            tasks: TaskQueue::new(),
        })
    }

    /// Name of the current cache generation.
    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    /// The routing table, in evaluation order.
    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Queue carrying the detached background work (refreshes,
    /// precaches). Hosts and tests can `drain().await` it.
    pub fn tasks(&self) -> &Arc<TaskQueue> {
        &self.tasks
    }

    /// Installation requested: seed the critical assets and signal
    /// skip-waiting. Any failure aborts the install.
    pub async fn handle_install(&self) -> Result<(), Error> {
        lifecycle::install(
            &self.storage,
            &self.network,
            &self.host,
            &self.config.origin,
            &self.config.cache_name,
            &self.config.critical_assets,
        )
        .await
    }

    /// Activation requested: delete stale generations and claim clients.
    pub async fn handle_activate(&self) -> Result<(), Error> {
        lifecycle::activate(&self.storage, &self.host, &self.config.cache_name).await
    }

    /// A request was intercepted. Cross-origin requests bypass; everything
    /// else runs exactly one strategy from the routing table.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !same_origin(&request.url, &self.config.origin) {
            tracing::debug!("bypassing cross-origin request to {}", request.url);
            return Ok(FetchOutcome::Bypass);
        }

        let Some(kind) = self.routes.route(request) else {
            return Ok(FetchOutcome::Bypass);
        };

        let store = self.storage.open(&self.config.cache_name).await?;
        let response = match kind {
            StrategyKind::StaleWhileRevalidate => {
                strategy::stale_while_revalidate(store, Arc::clone(&self.network), &self.tasks, request).await?
            }
            StrategyKind::NetworkFirst => strategy::network_first(store, Arc::clone(&self.network), request).await?,
            StrategyKind::CacheFirst => strategy::cache_first(store, Arc::clone(&self.network), request).await?,
        };

        Ok(FetchOutcome::Response(response))
    }

    /// A message arrived from the hosting page. Precache requests detach
    /// their work and return immediately; anything unrecognized is
    /// ignored. Nothing is ever sent back to the sender.
    pub async fn handle_message(&self, payload: serde_json::Value) {
        let message: Message = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("ignoring unrecognized message: {e}");
                return;
            }
        };

        match message {
            Message::PrecacheUrls { urls } => {
                let store = match self.storage.open(&self.config.cache_name).await {
                    Ok(store) => store,
                    Err(e) => {
                        tracing::warn!("precache could not open store {}: {e}", self.config.cache_name);
                        return;
                    }
                };
                precache::precache(store, Arc::clone(&self.network), &self.tasks, &self.config.origin, urls);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeNetwork, RecordingHost};
    use intercache_core::{CacheKey, MemoryStorage, Store};

    const ORIGIN: &str = "https://example.com";

    struct Harness {
        worker: Worker,
        storage: Arc<MemoryStorage>,
        network: Arc<FakeNetwork>,
        host: Arc<RecordingHost>,
    }

    fn harness() -> Harness {
        let config = AppConfig {
            app_id: "portfolio".into(),
            cache_version: "v2".into(),
            origin: ORIGIN.into(),
            critical_assets: vec!["/".into(), "/page.html".into(), "/img/a.webp".into()],
            ..Default::default()
        };
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let host = Arc::new(RecordingHost::new());
        let worker = Worker::new(&config, storage.clone(), network.clone(), host.clone()).unwrap();
        Harness { worker, storage, network, host }
    }

    fn script_critical_assets(network: &FakeNetwork) {
        network.respond("https://example.com/", Response::new(200, "root"));
        network.respond("https://example.com/page.html", Response::new(200, "<html>"));
        network.respond("https://example.com/img/a.webp", Response::new(200, "img-v1"));
    }

    async fn current_store(h: &Harness) -> Arc<dyn Store> {
        let storage: Arc<dyn CacheStorage> = h.storage.clone();
        storage.open(h.worker.cache_name()).await.unwrap()
    }

    fn body(outcome: FetchOutcome) -> String {
        match outcome {
            FetchOutcome::Response(response) => String::from_utf8_lossy(&response.body).into_owned(),
            FetchOutcome::Bypass => panic!("expected a response, got bypass"),
        }
    }

    #[test]
    fn test_worker_rejects_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = Worker::new(
            &config,
            Arc::new(MemoryStorage::new()),
            Arc::new(FakeNetwork::new()),
            Arc::new(NoopHost),
        );
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_cache_name_from_config() {
        let h = harness();
        assert_eq!(h.worker.cache_name(), "portfolio-v2");
    }

    #[tokio::test]
    async fn test_origin_is_canonicalized_before_comparison() {
        // Schemeless, mixed-case origin config still matches requests
        // to the canonical https://example.com.
        let config = AppConfig { origin: " EXAMPLE.COM ".into(), ..Default::default() };
        let network = Arc::new(FakeNetwork::new());
        let worker = Worker::new(
            &config,
            Arc::new(MemoryStorage::new()),
            network.clone(),
            Arc::new(NoopHost),
        )
        .unwrap();

        network.respond("https://example.com/img/a.webp", Response::new(200, "img"));
        let request = Request::get(Url::parse("https://example.com/img/a.webp").unwrap());
        let outcome = worker.handle_fetch(&request).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Response(_)));
    }

    #[tokio::test]
    async fn test_fragment_bearing_request_hits_bare_entry() {
        let h = harness();
        script_critical_assets(&h.network);
        h.worker.handle_install().await.unwrap();

        // Install seeded /page.html; the fragment must not miss it.
        h.network.fail("https://example.com/page.html#toc");
        let request = Request::navigate(Url::parse("https://example.com/page.html#toc").unwrap());
        let outcome = h.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(body(outcome), "<html>");
    }

    #[tokio::test]
    async fn test_cross_origin_is_never_intercepted() {
        let h = harness();
        let request = Request::get(Url::parse("https://cdn.other.com/img/a.webp").unwrap());
        let outcome = h.worker.handle_fetch(&request).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Bypass));
        assert_eq!(h.network.fetch_count("https://cdn.other.com/img/a.webp"), 0);
    }

    #[tokio::test]
    async fn test_install_then_activate_leaves_one_generation() {
        let h = harness();
        script_critical_assets(&h.network);

        // Stale generations from earlier deployments.
        let storage: Arc<dyn CacheStorage> = h.storage.clone();
        storage.open("portfolio-v1").await.unwrap();
        storage.open("portfolio-v0").await.unwrap();

        h.worker.handle_install().await.unwrap();
        h.worker.handle_activate().await.unwrap();

        assert_eq!(storage.list_names().await.unwrap(), vec!["portfolio-v2"]);
        assert_eq!(h.host.skip_waiting_calls(), 1);
        assert_eq!(h.host.claim_clients_calls(), 1);
    }

    #[tokio::test]
    async fn test_image_miss_then_hit_with_background_refresh() {
        let h = harness();
        script_critical_assets(&h.network);
        h.worker.handle_install().await.unwrap();
        h.worker.handle_activate().await.unwrap();

        let request = Request::get(Url::parse("https://example.com/img/new.webp").unwrap());
        h.network.respond("https://example.com/img/new.webp", Response::new(200, "first"));

        // Miss: fetched from network, stored, returned.
        let outcome = h.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(body(outcome), "first");
        assert_eq!(h.network.fetch_count("https://example.com/img/new.webp"), 1);

        // Hit: served from store, refresh detached.
        h.network.respond("https://example.com/img/new.webp", Response::new(200, "second"));
        let outcome = h.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(body(outcome), "first");

        h.worker.tasks().drain().await;
        assert_eq!(h.network.fetch_count("https://example.com/img/new.webp"), 2);

        let store = current_store(&h).await;
        let stored = store.lookup(&request.cache_key()).await.unwrap().unwrap();
        assert_eq!(String::from_utf8_lossy(&stored.body), "second");
    }

    #[tokio::test]
    async fn test_html_offline_falls_back_to_cached_copy() {
        let h = harness();
        script_critical_assets(&h.network);
        h.worker.handle_install().await.unwrap();

        let request = Request::navigate(Url::parse("https://example.com/page.html").unwrap());

        // Network gone: install's cached copy answers.
        h.network.fail("https://example.com/page.html");
        let outcome = h.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(body(outcome), "<html>");
    }

    #[tokio::test]
    async fn test_html_offline_without_cache_propagates_failure() {
        let h = harness();
        let request = Request::navigate(Url::parse("https://example.com/uncached.html").unwrap());
        h.network.fail("https://example.com/uncached.html");

        let result = h.worker.handle_fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_precache_message_is_best_effort_and_silent() {
        let h = harness();
        h.network.fail("https://example.com/img/b.webp");
        h.network.respond("https://example.com/img/c.webp", Response::new(200, "c"));

        h.worker
            .handle_message(serde_json::json!({
                "type": "PRECACHE_URLS",
                "urls": ["/img/b.webp", "/img/c.webp"],
            }))
            .await;
        h.worker.tasks().drain().await;

        let store = current_store(&h).await;
        assert!(store.lookup(&CacheKey::new("GET", "https://example.com/img/b.webp")).await.unwrap().is_none());
        assert!(store.lookup(&CacheKey::new("GET", "https://example.com/img/c.webp")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_message_is_ignored() {
        let h = harness();
        h.worker
            .handle_message(serde_json::json!({ "type": "UNKNOWN", "urls": ["/x"] }))
            .await;
        h.worker.tasks().drain().await;

        let storage: Arc<dyn CacheStorage> = h.storage.clone();
        // Nothing opened, nothing fetched.
        assert!(storage.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_never_holds_non_200_responses() {
        let h = harness();
        script_critical_assets(&h.network);
        h.worker.handle_install().await.unwrap();

        // Drive every strategy with non-200 answers.
        h.network.respond("https://example.com/img/x.webp", Response::new(404, "gone"));
        h.network.respond("https://example.com/other.html", Response::new(500, "boom"));
        h.network.respond("https://example.com/app.js", Response::new(301, ""));

        for request in [
            Request::get(Url::parse("https://example.com/img/x.webp").unwrap()),
            Request::navigate(Url::parse("https://example.com/other.html").unwrap()),
            Request::get(Url::parse("https://example.com/app.js").unwrap()),
        ] {
            let outcome = h.worker.handle_fetch(&request).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::Response(_)));
        }
        h.worker.tasks().drain().await;

        let store = current_store(&h).await;
        for url in [
            "https://example.com/img/x.webp",
            "https://example.com/other.html",
            "https://example.com/app.js",
        ] {
            assert!(store.lookup(&CacheKey::new("GET", url)).await.unwrap().is_none(), "{url} was cached");
        }
    }
}

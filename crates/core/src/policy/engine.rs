//! Freshness policy engine.
//!
//! Entry points invoked by a host adapter: [`PolicyEngine::handle_request`],
//! [`PolicyEngine::handle_startup`], [`PolicyEngine::handle_install`] and the
//! bulk resync in `resync.rs`. Each call reads the metadata snapshot, decides,
//! acts, and writes back whatever changed. Concurrent calls race on the
//! metadata row; last write wins.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::decision::{Decision, Fallback, RequestFacts, ServedFrom, decide, fallback_after_failed_refresh};
use crate::cache::{CacheDb, MetadataRecord, StoredResource};
use crate::fetch::{Fetcher, NetworkResponse, RequestMode, ResourceRequest};
use crate::health::{SlowNetworkWindow, is_slow_network_active, mark_network_slow};
use crate::manifest::{AssetManifest, normalize};
use crate::store::{MetadataStore, ResourceStore};
use crate::{AppConfig, Error};

/// Epoch-millisecond clock.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// A response together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub source: ServedFrom,
    pub response: StoredResource,
}

impl Served {
    fn new(source: ServedFrom, response: StoredResource) -> Self {
        Self { source, response }
    }
}

/// Result of the startup (activate) sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StartupReport {
    /// Resources dropped from superseded generations.
    pub purged: u64,
    /// Whether the metadata record was reset.
    pub metadata_reset: bool,
}

/// Point-in-time view of the engine's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStatus {
    pub cache_tag: String,
    pub slow_network: bool,
    pub slow_until: Option<i64>,
    pub retry_at: Option<i64>,
    pub tracked_urls: usize,
    pub manifest_assets: usize,
}

pub struct PolicyEngine {
    pub(super) config: AppConfig,
    pub(super) origin: Url,
    pub(super) manifest: AssetManifest,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) resources: Arc<dyn ResourceStore>,
    pub(super) metadata: Arc<dyn MetadataStore>,
    clock: Clock,
}

impl PolicyEngine {
    pub fn new(
        config: AppConfig, manifest: AssetManifest, fetcher: Arc<dyn Fetcher>, resources: Arc<dyn ResourceStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        Ok(Self { config, origin, manifest, fetcher, resources, metadata, clock: system_clock() })
    }

    /// Engine backed by a single SQLite database for both stores.
    pub fn with_db(
        config: AppConfig, manifest: AssetManifest, fetcher: Arc<dyn Fetcher>, db: CacheDb,
    ) -> Result<Self, Error> {
        let db = Arc::new(db);
        Self::new(config, manifest, fetcher, db.clone(), db)
    }

    /// Replace the system clock, e.g. with a fixed instant.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub(super) fn now(&self) -> i64 {
        (self.clock)()
    }

    pub(super) fn timeout(&self) -> Duration {
        self.config.fetch_timeout()
    }

    pub(super) fn window(&self) -> SlowNetworkWindow {
        SlowNetworkWindow::from_config(&self.config)
    }

    /// Build a normalized request key from adapter input.
    pub fn request_for(&self, url: &str, method: &str, navigate: bool) -> Result<ResourceRequest, Error> {
        let url = normalize(url, &self.origin)?;
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("method: {e}")))?;
        let mode = if navigate { RequestMode::Navigate } else { RequestMode::Subresource };
        Ok(ResourceRequest { url, method, mode, body: None })
    }

    /// Answer one request according to the freshness policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkUnreachable`] when the network fails and there
    /// is no cached copy to fall back on, or when a pass-through request fails.
    pub async fn handle_request(&self, request: &ResourceRequest) -> Result<Served, Error> {
        let now = self.now();

        if request.method != Method::GET {
            debug!(url = %request.url, method = %request.method, "pass-through");
            let response = self.fetcher.fetch(request, None).await?;
            return Ok(Served::new(ServedFrom::PassThrough, response.to_stored(&request.url, now)));
        }

        let key = request.url.as_str();
        let cached = match self.resources.get(&self.config.cache_tag, key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(url = key, error = %e, "resource cache read failed, treating as miss");
                None
            }
        };
        let mut record = self.metadata.get().await;
        let age = record.age(key, now);

        let facts = RequestFacts {
            is_get: true,
            has_entry: cached.is_some(),
            is_sentinel: self.manifest.is_sentinel(&request.url),
            age,
            slow_network: is_slow_network_active(&record, now),
        };
        let decision = decide(facts, self.config.cache_expiry_ms);
        debug!(url = key, ?decision, ?age, "freshness decision");

        match (decision, cached) {
            (Decision::ServeCached, Some(entry)) => Ok(Served::new(ServedFrom::Cache, entry)),
            (Decision::RefreshExpired, Some(entry)) => self.refresh(request, entry, age, &mut record, now).await,
            (_, cached) => self.fetch_network(request, cached, &mut record, now).await,
        }
    }

    async fn refresh(
        &self, request: &ResourceRequest, entry: StoredResource, age: Option<i64>, record: &mut MetadataRecord,
        now: i64,
    ) -> Result<Served, Error> {
        match self.fetcher.fetch(request, Some(self.timeout())).await {
            Ok(response) => Ok(self.accept(request, response, record, now).await),
            Err(e) => {
                debug!(url = %request.url, error = %e, "refresh failed");
                mark_network_slow(record, now, self.window());
                self.metadata.put(record).await;

                match fallback_after_failed_refresh(request.is_navigation(), age, self.config.max_offline_ms) {
                    Fallback::Sentinel => match self.sentinel().await {
                        Some(sentinel) => Ok(Served::new(ServedFrom::Sentinel, sentinel)),
                        None => {
                            warn!(url = %request.url, "sentinel not cached, serving stale entry");
                            Ok(Served::new(ServedFrom::CacheFallback, entry))
                        }
                    },
                    Fallback::Stale => Ok(Served::new(ServedFrom::CacheFallback, entry)),
                }
            }
        }
    }

    async fn fetch_network(
        &self, request: &ResourceRequest, cached: Option<StoredResource>, record: &mut MetadataRecord, now: i64,
    ) -> Result<Served, Error> {
        match self.fetcher.fetch(request, Some(self.timeout())).await {
            Ok(response) => Ok(self.accept(request, response, record, now).await),
            Err(e) => {
                mark_network_slow(record, now, self.window());
                self.metadata.put(record).await;
                match cached {
                    Some(entry) => Ok(Served::new(ServedFrom::CacheFallback, entry)),
                    None => Err(e),
                }
            }
        }
    }

    /// Store a successful response and stamp its timestamp. Non-2xx responses
    /// are returned untouched.
    async fn accept(
        &self, request: &ResourceRequest, response: NetworkResponse, record: &mut MetadataRecord, now: i64,
    ) -> Served {
        let stored = response.to_stored(&request.url, now);
        if !response.status.is_success() {
            debug!(url = %request.url, status = response.status.as_u16(), "not caching unsuccessful response");
            return Served::new(ServedFrom::Network, stored);
        }

        match self.resources.put(&self.config.cache_tag, &stored).await {
            Ok(()) => {
                record.stamp(request.url.as_str(), now);
                self.metadata.put(record).await;
            }
            Err(e) => warn!(url = %request.url, error = %e, "failed to cache response"),
        }
        Served::new(ServedFrom::Network, stored)
    }

    async fn sentinel(&self) -> Option<StoredResource> {
        match self.resources.get(&self.config.cache_tag, self.manifest.sentinel().as_str()).await {
            Ok(sentinel) => sentinel,
            Err(e) => {
                warn!(error = %e, "failed to read sentinel");
                None
            }
        }
    }

    /// Activate the current cache generation.
    ///
    /// Drops every other generation; if anything was dropped, the metadata
    /// record is reset since its timestamps described bytes that are gone.
    pub async fn handle_startup(&self) -> Result<StartupReport, Error> {
        let purged = self.resources.purge_except(&self.config.cache_tag).await?;
        let metadata_reset = purged > 0;
        if metadata_reset {
            self.metadata.put(&MetadataRecord::default()).await;
        }
        info!(cache_tag = %self.config.cache_tag, purged, metadata_reset, "cache generation activated");
        Ok(StartupReport { purged, metadata_reset })
    }

    /// Precache every manifest asset into the current generation.
    ///
    /// All or nothing: every asset is fetched before anything is stored, and a
    /// single failure aborts the install.
    pub async fn handle_install(&self) -> Result<usize, Error> {
        let mut fetched = Vec::with_capacity(self.manifest.len());
        for url in self.manifest.assets() {
            let request = ResourceRequest::get(url.clone());
            let response = self.fetcher.fetch(&request, Some(self.timeout())).await?;
            if !response.status.is_success() {
                return Err(Error::NetworkUnreachable(format!("{url}: status {}", response.status.as_u16())));
            }
            fetched.push((request, response));
        }

        let now = self.now();
        let mut record = self.metadata.get().await;
        for (request, response) in &fetched {
            self.resources
                .put(&self.config.cache_tag, &response.to_stored(&request.url, now))
                .await?;
            record.stamp(request.url.as_str(), now);
        }
        self.metadata.put(&record).await;

        info!(cache_tag = %self.config.cache_tag, assets = fetched.len(), "precache complete");
        Ok(fetched.len())
    }

    pub async fn status(&self) -> CacheStatus {
        let now = self.now();
        let record = self.metadata.get().await;
        CacheStatus {
            cache_tag: self.config.cache_tag.clone(),
            slow_network: is_slow_network_active(&record, now),
            slow_until: record.slow_until,
            retry_at: record.retry_at,
            tracked_urls: record.fetched_at.len(),
            manifest_assets: self.manifest.len(),
        }
    }
}

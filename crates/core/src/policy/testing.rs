//! In-process doubles for policy tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use url::Url;

use super::engine::PolicyEngine;
use crate::cache::{CacheDb, MetadataRecord, StoredResource};
use crate::fetch::{Fetcher, NetworkResponse, ResourceRequest};
use crate::manifest::AssetManifest;
use crate::store::{MetadataStore, ResourceStore};
use crate::{AppConfig, Error};

pub const NOW: i64 = 1_750_000_000_000;
pub const TAG: &str = "bundlecache-test";
pub const ORIGIN: &str = "https://app.example.com/";

pub fn fresh_body(url: &Url) -> Bytes {
    Bytes::from(format!("fresh:{url}"))
}

/// Answers every request with `fresh:<url>` unless told otherwise.
#[derive(Default)]
pub struct ScriptedFetcher {
    calls: Mutex<Vec<(String, Option<Duration>)>>,
    failing: Mutex<HashSet<String>>,
    statuses: Mutex<HashMap<String, u16>>,
    offline: AtomicBool,
}

impl ScriptedFetcher {
    pub fn fail(&self, url: &Url) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn respond_with_status(&self, url: &Url, status: u16) {
        self.statuses.lock().unwrap().insert(url.to_string(), status);
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.calls.lock().unwrap().iter().map(|(_, timeout)| *timeout).collect()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &ResourceRequest, timeout: Option<Duration>) -> Result<NetworkResponse, Error> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push((key.clone(), timeout));

        if self.failing.lock().unwrap().contains(&key) {
            return Err(Error::NetworkUnreachable(format!("{key}: connection refused")));
        }

        let status = self.statuses.lock().unwrap().get(&key).copied().unwrap_or(200);
        Ok(NetworkResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            content_type: Some("text/plain".into()),
            headers: vec![],
            body: fresh_body(&request.url),
        })
    }

    fn is_online(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

/// Metadata store that counts writes.
pub struct CountingMetadata {
    inner: CacheDb,
    puts: AtomicUsize,
}

impl CountingMetadata {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for CountingMetadata {
    async fn get(&self) -> MetadataRecord {
        MetadataStore::get(&self.inner).await
    }

    async fn put(&self, record: &MetadataRecord) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        MetadataStore::put(&self.inner, record).await;
    }
}

/// Resource store whose writes always fail.
pub struct ReadOnlyResources(CacheDb);

#[async_trait]
impl ResourceStore for ReadOnlyResources {
    async fn get(&self, generation: &str, url: &str) -> Result<Option<StoredResource>, Error> {
        self.0.get_resource(generation, url).await
    }

    async fn put(&self, _generation: &str, _resource: &StoredResource) -> Result<(), Error> {
        Err(Error::StoreUnavailable("disk full".into()))
    }

    async fn purge_except(&self, keep: &str) -> Result<u64, Error> {
        self.0.purge_other_generations(keep).await
    }
}

pub struct Harness {
    pub engine: PolicyEngine,
    pub db: CacheDb,
    pub fetcher: Arc<ScriptedFetcher>,
    pub metadata: Arc<CountingMetadata>,
}

impl Harness {
    pub async fn new(now: i64) -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        Self::build(now, db.clone(), Arc::new(db))
    }

    pub async fn with_failing_writes(now: i64) -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        Self::build(now, db.clone(), Arc::new(ReadOnlyResources(db)))
    }

    fn build(now: i64, db: CacheDb, resources: Arc<dyn ResourceStore>) -> Self {
        let config = AppConfig { origin: ORIGIN.into(), cache_tag: TAG.into(), ..Default::default() };
        let origin = Url::parse(ORIGIN).unwrap();
        let manifest = AssetManifest::builtin(&origin).unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let metadata = Arc::new(CountingMetadata { inner: db.clone(), puts: AtomicUsize::new(0) });

        let engine = PolicyEngine::new(config, manifest, fetcher.clone(), resources, metadata.clone())
            .unwrap()
            .with_clock(Arc::new(move || now));

        Self { engine, db, fetcher, metadata }
    }
}

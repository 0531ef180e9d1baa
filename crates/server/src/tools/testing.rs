//! Engine fixtures for tool tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bundlecache_core::{
    AppConfig, AssetManifest, CacheDb, Error, Fetcher, NetworkResponse, PolicyEngine, ResourceRequest,
};
use http::StatusCode;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use url::Url;

pub const ORIGIN: &str = "https://app.example.com/";

/// Echoes `body:<url>` for every request except those marked unreachable.
#[derive(Default)]
pub struct EchoFetcher {
    unreachable: Mutex<HashSet<String>>,
    offline: AtomicBool,
}

impl EchoFetcher {
    pub fn unreachable(&self, url: &str) {
        self.unreachable.lock().unwrap().insert(url.to_string());
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for EchoFetcher {
    async fn fetch(&self, request: &ResourceRequest, _timeout: Option<Duration>) -> Result<NetworkResponse, Error> {
        if self.unreachable.lock().unwrap().contains(request.url.as_str()) {
            return Err(Error::NetworkUnreachable("connection refused".into()));
        }
        Ok(NetworkResponse {
            url: request.url.clone(),
            status: StatusCode::OK,
            content_type: Some("text/plain".into()),
            headers: vec![],
            body: bytes::Bytes::from(format!("body:{}", request.url)),
        })
    }

    fn is_online(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

pub async fn engine() -> (PolicyEngine, Arc<EchoFetcher>) {
    let config = AppConfig { origin: ORIGIN.into(), ..Default::default() };
    let manifest = AssetManifest::builtin(&Url::parse(ORIGIN).unwrap()).unwrap();
    let fetcher = Arc::new(EchoFetcher::default());
    let db = CacheDb::open_in_memory().await.unwrap();
    let engine = PolicyEngine::with_db(config, manifest, fetcher.clone(), db).unwrap();
    (engine, fetcher)
}

/// Decode the JSON text content of a tool result.
pub fn decode<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

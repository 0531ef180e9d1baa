//! Timed HTTP fetcher.
//!
//! ### Timeouts
//! - A bound, when given, covers the whole exchange: connect, headers and body.
//! - On expiry the in-flight request future is dropped, which aborts the
//!   underlying connection. No late response is ever observed.
//! - Without a bound the request runs to completion (pass-through traffic).
//!
//! ### Failures
//! - Transport errors and elapsed bounds both surface as
//!   [`Error::NetworkUnreachable`].
//! - Non-2xx statuses are ordinary responses; the caller decides what to keep.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bundlecache_core::{AppConfig, Error, Fetcher, NetworkResponse, ResourceRequest};
use reqwest::{Client, header};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "bundlecache/0.1")
    pub user_agent: String,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "bundlecache/0.1".to_string(), max_redirects: 5 }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), ..Self::default() }
    }
}

/// HTTP client that enforces per-request time bounds.
pub struct TimedFetcher {
    http: Client,
    config: FetchConfig,
    online: AtomicBool,
}

impl TimedFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, online: AtomicBool::new(true) })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(FetchConfig::from_app(config))
    }

    /// Override the connectivity signal reported to the engine.
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            tracing::info!(online, "connectivity changed");
        }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn send(&self, request: &ResourceRequest) -> Result<NetworkResponse, Error> {
        let mut builder = self.http.request(request.method.clone(), request.url.as_str());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::NetworkUnreachable(format!("{}: {e}", request.url)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let headers = header_pairs(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnreachable(format!("failed to read response: {e}")))?;

        Ok(NetworkResponse { url: final_url, status, content_type, headers, body })
    }
}

#[async_trait]
impl Fetcher for TimedFetcher {
    async fn fetch(&self, request: &ResourceRequest, timeout: Option<Duration>) -> Result<NetworkResponse, Error> {
        let start = Instant::now();
        let response = bounded(timeout, self.send(request))
            .await
            .inspect_err(|e| tracing::debug!(url = %request.url, error = %e, "fetch failed"))?;

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request.url,
            response.url,
            response.status.as_u16(),
            start.elapsed().as_millis(),
            response.body.len()
        );
        Ok(response)
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Race `fut` against an optional deadline, dropping it when the deadline wins.
async fn bounded<T>(
    timeout: Option<Duration>, fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::NetworkUnreachable(format!("timed out after {}ms", limit.as_millis())))?,
        None => fut.await,
    }
}

fn header_pairs(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlecache_core::{AssetManifest, CacheDb, PolicyEngine, ServedFrom, StoredResource};
    use http::{Method, StatusCode};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    /// Serve `response` verbatim to the first connection, after reading its request head.
    async fn one_shot_server(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{addr}/index.html")).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "bundlecache/0.1");
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig { user_agent: "custom/2.0".into(), ..Default::default() };
        assert_eq!(FetchConfig::from_app(&app).user_agent, "custom/2.0");
    }

    #[tokio::test]
    async fn test_fetcher_new() {
        let fetcher = TimedFetcher::from_config(&AppConfig::default());
        assert!(fetcher.is_ok());
        assert!(fetcher.unwrap().is_online());
    }

    #[tokio::test]
    async fn test_set_online() {
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();
        fetcher.set_online(false);
        assert!(!fetcher.is_online());
        fetcher.set_online(true);
        assert!(fetcher.is_online());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = one_shot_server(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();

        let response = fetcher
            .fetch(&ResourceRequest::get(url.clone()), Some(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.url, url);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
        assert_eq!(&response.body[..], b"hello");
        assert!(response.headers.iter().any(|(k, v)| k == "content-length" && v == "5"));
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let url = one_shot_server("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();

        let response = fetcher.fetch(&ResourceRequest::get(url), None).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_pass_through_forwards_method_and_body() {
        let url = one_shot_server("HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();
        let request = ResourceRequest {
            method: Method::POST,
            body: Some(bytes::Bytes::from_static(b"{}")),
            ..ResourceRequest::get(url)
        };

        let response = fetcher.fetch(&request, None).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_network_unreachable() {
        // Accepts the connection (via the backlog) but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = Url::parse(&format!("http://{addr}/slow")).unwrap();
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();

        let start = Instant::now();
        let result = fetcher
            .fetch(&ResourceRequest::get(url), Some(Duration::from_millis(200)))
            .await;

        assert!(start.elapsed() < Duration::from_secs(5));
        match result {
            Err(Error::NetworkUnreachable(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
        drop(listener);
    }

    #[tokio::test]
    async fn test_refused_connection_maps_to_network_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();

        let result = fetcher.fetch(&ResourceRequest::get(url), Some(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(Error::NetworkUnreachable(_))));
    }

    #[tokio::test]
    async fn test_engine_treats_timeout_as_slow_network() {
        const NOW: i64 = 1_750_000_000_000;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

        let config = AppConfig { origin: origin.to_string(), slow_net_timeout_ms: 200, ..Default::default() };
        let manifest = AssetManifest::builtin(&origin).unwrap();
        let fetcher = Arc::new(TimedFetcher::from_config(&config).unwrap());
        let db = CacheDb::open_in_memory().await.unwrap();
        let tag = config.cache_tag.clone();
        let engine = PolicyEngine::with_db(config, manifest, fetcher, db.clone())
            .unwrap()
            .with_clock(Arc::new(|| NOW));

        let page = origin.join("/index.html").unwrap();
        let stale = StoredResource {
            url: page.to_string(),
            status: 200,
            content_type: Some("text/html".into()),
            headers: vec![],
            body: bytes::Bytes::from_static(b"stale"),
            stored_at: NOW - 2 * 86_400_000,
        };
        db.put_resource(&tag, &stale).await.unwrap();
        let mut record = bundlecache_core::MetadataRecord::default();
        record.stamp(page.as_str(), stale.stored_at);
        db.save_metadata(&record).await.unwrap();

        let start = Instant::now();
        let served = engine.handle_request(&ResourceRequest::navigate(page)).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));

        assert_eq!(served.source, ServedFrom::CacheFallback);
        assert_eq!(&served.response.body[..], b"stale");
        let record = db.load_metadata().await.unwrap().unwrap();
        assert_eq!(record.slow_until, Some(NOW + 5_400_000));
        assert_eq!(record.retry_at, Some(NOW + 7_200_000));

        let missing = origin.join("/assets/app.js").unwrap();
        let result = engine.handle_request(&ResourceRequest::get(missing)).await;
        assert!(matches!(result, Err(Error::NetworkUnreachable(_))));
        drop(listener);
    }
}

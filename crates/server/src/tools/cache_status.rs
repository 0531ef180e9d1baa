//! cache_status tool implementation.

use bundlecache_core::PolicyEngine;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Implementation of the cache_status tool.
pub async fn status_impl(engine: &PolicyEngine) -> Result<CallToolResult, McpError> {
    json_result(&engine.status().await)
}

#[cfg(test)]
mod tests {
    use super::super::resource_fetch::{ResourceFetchParams, fetch_impl};
    use super::super::testing::{ORIGIN, decode, engine};
    use super::*;
    use bundlecache_core::CacheStatus;

    #[tokio::test]
    async fn test_status_fresh_engine() {
        let (engine, _) = engine().await;

        let status: CacheStatus = decode(&status_impl(&engine).await.unwrap());
        assert_eq!(status.cache_tag, "bundlecache-v1");
        assert!(!status.slow_network);
        assert_eq!(status.tracked_urls, 0);
        assert_eq!(status.manifest_assets, engine.manifest().len());
    }

    #[tokio::test]
    async fn test_status_reflects_slow_network() {
        let (engine, fetcher) = engine().await;
        fetcher.unreachable(&format!("{ORIGIN}gone"));
        let params = ResourceFetchParams { url: "/gone".into(), method: "GET".into(), navigate: false };
        assert!(fetch_impl(&engine, params).await.is_err());

        let status: CacheStatus = decode(&status_impl(&engine).await.unwrap());
        assert!(status.slow_network);
        assert!(status.slow_until.is_some());
        assert!(status.retry_at > status.slow_until);
    }
}

//! resource_fetch tool implementation.
//!
//! Answers one request through the freshness policy.

use bundlecache_core::{PolicyEngine, ServedFrom};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

fn default_method() -> String {
    "GET".to_string()
}

/// Parameters for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,
}

/// Output from the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub served_from: ServedFrom,
    /// Response body, decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(engine: &PolicyEngine, params: ResourceFetchParams) -> Result<CallToolResult, McpError> {
    let request = engine.request_for(&params.url, &params.method, params.navigate)?;
    let served = engine.handle_request(&request).await?;

    let output = ResourceFetchOutput {
        url: served.response.url,
        status: served.response.status,
        content_type: served.response.content_type,
        served_from: served.source,
        body: String::from_utf8_lossy(&served.response.body).into_owned(),
    };
    json_result(&output)
}

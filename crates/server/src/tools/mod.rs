//! MCP tool implementations.
//!
//! This module contains all tools exposed by the bundlecache server. Each tool
//! is a thin `*_impl` function over the policy engine so tests can call it
//! without a transport.

pub mod cache_status;
pub mod network_mode;
pub mod recache_all;
pub mod resource_fetch;

#[cfg(test)]
pub(crate) mod testing;

pub use cache_status::status_impl;
pub use network_mode::{NetworkModeParams, network_mode_impl};
pub use recache_all::{RecacheAllParams, recache_impl};
pub use resource_fetch::{ResourceFetchParams, fetch_impl};

use bundlecache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

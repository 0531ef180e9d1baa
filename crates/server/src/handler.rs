//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the policy engine.
use std::sync::Arc;

use bundlecache_client::TimedFetcher;
use bundlecache_core::PolicyEngine;

use crate::tools::{
    NetworkModeParams, RecacheAllParams, ResourceFetchParams, fetch_impl, network_mode_impl, recache_impl,
    status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for bundlecache.
#[derive(Clone)]
pub struct BundleCacheServer {
    engine: Arc<PolicyEngine>,
    fetcher: Arc<TimedFetcher>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl BundleCacheServer {
    /// Create a new server handler.
    ///
    /// `fetcher` must be the same instance the engine was built with, so
    /// `network_mode` reaches the signal resync consults.
    pub fn new(engine: Arc<PolicyEngine>, fetcher: Arc<TimedFetcher>) -> Self {
        Self { engine, fetcher, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Fetch a resource through the offline cache. Returns status, content type, body, and whether it came from the network, the cache, or the offline placeholder."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Re-download every precached asset. Returns the ordered progress events, ending in Done or Error.")]
    async fn recache_all(&self, params: Parameters<RecacheAllParams>) -> Result<CallToolResult, McpError> {
        recache_impl(&self.engine, params.0).await
    }

    #[tool(description = "Report cache generation, slow-network state, and number of tracked URLs.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.engine).await
    }

    #[tool(description = "Tell the cache whether the host is online. Bulk recache is refused while offline.")]
    async fn network_mode(&self, params: Parameters<NetworkModeParams>) -> Result<CallToolResult, McpError> {
        network_mode_impl(&self.fetcher, params.0).await
    }
}

impl ServerHandler for BundleCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "bundlecache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

//! network_mode tool implementation.
//!
//! Flips the connectivity signal consulted by bulk resync.

use bundlecache_client::TimedFetcher;
use bundlecache_core::Fetcher;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the network_mode tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NetworkModeParams {
    /// Whether the host currently has connectivity.
    pub online: bool,
}

/// Output from the network_mode tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NetworkModeOutput {
    pub online: bool,
}

/// Implementation of the network_mode tool.
pub async fn network_mode_impl(fetcher: &TimedFetcher, params: NetworkModeParams) -> Result<CallToolResult, McpError> {
    fetcher.set_online(params.online);
    json_result(&NetworkModeOutput { online: fetcher.is_online() })
}

#[cfg(test)]
mod tests {
    use super::super::testing::decode;
    use super::*;
    use bundlecache_client::FetchConfig;

    #[tokio::test]
    async fn test_network_mode_toggles() {
        let fetcher = TimedFetcher::new(FetchConfig::default()).unwrap();

        let output: NetworkModeOutput =
            decode(&network_mode_impl(&fetcher, NetworkModeParams { online: false }).await.unwrap());
        assert!(!output.online);
        assert!(!fetcher.is_online());

        let output: NetworkModeOutput =
            decode(&network_mode_impl(&fetcher, NetworkModeParams { online: true }).await.unwrap());
        assert!(output.online);
    }
}

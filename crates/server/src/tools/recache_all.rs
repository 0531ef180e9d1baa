//! recache_all tool implementation.
//!
//! Dispatches `RECACHE_ALL` and reports every event the resync published.

use bundlecache_core::{Command, PolicyEngine, ResyncEvent};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the recache_all tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RecacheAllParams {}

/// Output from the recache_all tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecacheAllOutput {
    /// Events in publication order; the last one is `Done` or `Error`.
    pub events: Vec<ResyncEvent>,
}

/// Implementation of the recache_all tool.
pub async fn recache_impl(engine: &PolicyEngine, _params: RecacheAllParams) -> Result<CallToolResult, McpError> {
    let events = engine.run_command(Command::RecacheAll).await;
    json_result(&RecacheAllOutput { events })
}

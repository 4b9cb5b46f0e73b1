use gantry_core::ResourceManager;
use gantry_mcp::McpHandler;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    pub resources: Arc<ResourceManager>,
    pub mcp: McpHandler,
    pub invoke_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(resources: Arc<ResourceManager>, invoke_timeout: Option<Duration>) -> Self {
        Self {
            mcp: McpHandler::new(Arc::clone(&resources)).with_invoke_timeout(invoke_timeout),
            resources,
            invoke_timeout,
        }
    }
}

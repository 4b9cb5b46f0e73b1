//! Error types for the server crate.

use gantry_core::ConfigError;
use gantry_mcp::McpError;
use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Loading or initializing resources failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The listen address could not be bound.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The config watcher could not be set up.
    #[error("failed to watch configuration: {0}")]
    Watch(#[from] notify::Error),

    /// The stdio transport failed.
    #[error(transparent)]
    Mcp(#[from] McpError),
}

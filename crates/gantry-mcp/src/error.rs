//! Error types for the MCP crate.

use thiserror::Error;

/// Errors that end an MCP transport loop.
#[derive(Debug, Error)]
pub enum McpError {
    /// Reading from or writing to the transport failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

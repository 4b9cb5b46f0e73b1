//! # gantry-mcp
//!
//! MCP (Model Context Protocol) surface of the gantry tool gateway.
//!
//! [`McpHandler`] dispatches JSON-RPC 2.0 requests against the live
//! resources of a [`gantry_core::ResourceManager`]:
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | negotiated protocol version, capabilities, server info |
//! | `ping` | `{}` |
//! | `tools/list` | MCP manifests of the toolset's tools |
//! | `tools/call` | text content, `isError` set when the tool failed |
//! | `prompts/list` | MCP manifests of every prompt |
//! | `prompts/get` | rendered prompt messages |
//!
//! Transports only supply a [`RequestContext`]. The HTTP transport lives in
//! `gantry-server`; the stdio transport is [`McpHandler::run_stdio`].

pub mod context;
pub mod error;
pub mod protocol;
pub mod server;

pub use context::RequestContext;
pub use error::McpError;
pub use protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS, TextContent,
};
pub use server::{McpHandler, UNAUTHORIZED_TOOL_CALL};

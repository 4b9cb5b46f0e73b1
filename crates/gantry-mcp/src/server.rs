//! MCP method dispatch.
//!
//! [`McpHandler`] answers JSON-RPC requests against the current
//! [`ResourceManager`] snapshot. It is transport-agnostic: the HTTP server
//! and the stdio loop both feed it one message at a time.

use crate::context::RequestContext;
use crate::error::McpError;
use crate::protocol::error_codes::*;
use crate::protocol::*;
use gantry_core::prompts::DEFAULT_PROMPTSET;
use gantry_core::toolsets::DEFAULT_TOOLSET;
use gantry_core::{InvokeError, ResourceManager, SERVER_VERSION, ToolError, invoke_tool};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const UNAUTHORIZED_TOOL_CALL: &str =
    "unauthorized Tool call: Please make sure your specify correct auth headers";

/// Dispatches MCP requests to tools and prompts.
#[derive(Clone)]
pub struct McpHandler {
    resources: Arc<ResourceManager>,
    invoke_timeout: Option<Duration>,
}

impl McpHandler {
    pub fn new(resources: Arc<ResourceManager>) -> Self {
        Self {
            resources,
            invoke_timeout: None,
        }
    }

    /// Bounds every `tools/call`; an overrun is reported as a tool error.
    pub fn with_invoke_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    /// Parses and handles one raw JSON-RPC message.
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_message(
        &self,
        body: &str,
        toolset: &str,
        ctx: &RequestContext,
    ) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::error(None, PARSE_ERROR, format!("parse error: {e}")));
            }
        };
        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let message = format!("invalid request: {e}");
                return Some(JsonRpcResponse::error(id, INVALID_REQUEST, message));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("invalid json-rpc version {:?}", request.jsonrpc),
            ));
        }
        self.handle_request(request, toolset, ctx).await
    }

    /// Handle a JSON-RPC request scoped to `toolset`.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        toolset: &str,
        ctx: &RequestContext,
    ) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "received notification");
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id, toolset),
            "tools/call" => self.handle_call_tool(id, request.params, toolset, ctx).await,
            "prompts/list" => self.handle_list_prompts(id),
            "prompts/get" => self.handle_get_prompt(id, request.params, ctx),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    let message = format!("Invalid params: {e}");
                    return JsonRpcResponse::error(id, INVALID_PARAMS, message);
                }
            },
            None => InitializeParams::default(),
        };
        let version = negotiate_protocol_version(&params.protocol_version);
        tracing::info!(
            requested = %params.protocol_version,
            negotiated = version,
            client = ?params.client_info.as_ref().map(|c| &c.name),
            "MCP session initialized"
        );
        respond(
            id,
            &InitializeResult {
                protocol_version: version.to_string(),
                capabilities: ServerCapabilities {
                    tools: ListChanged { list_changed: false },
                    prompts: ListChanged { list_changed: false },
                },
                server_info: Implementation {
                    name: SERVER_NAME.to_string(),
                    version: SERVER_VERSION.to_string(),
                },
            },
        )
    }

    fn handle_list_tools(&self, id: Option<Value>, toolset: &str) -> JsonRpcResponse {
        match self.resources.get_toolset(toolset) {
            Some(toolset) => respond(
                id,
                &ListToolsResult {
                    tools: toolset.mcp_manifests(),
                },
            ),
            None => JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("toolset \"{toolset}\" does not exist"),
            ),
        }
    }

    async fn handle_call_tool(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        toolset: &str,
        ctx: &RequestContext,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match decode_params(params) {
            Ok(params) => params,
            Err(message) => return JsonRpcResponse::error(id, INVALID_PARAMS, message),
        };

        let tool = self
            .resources
            .get_toolset(toolset)
            .and_then(|set| set.tools.iter().find(|t| t.name() == params.name).cloned());
        let Some(tool) = tool else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("invalid tool name: tool with name \"{}\" does not exist", params.name),
            );
        };

        let caller = ctx.caller_for(tool.as_ref());
        match invoke_tool(tool.as_ref(), &params.arguments, &caller, self.invoke_timeout).await {
            Ok(value) => respond(id, &call_result(&value)),
            Err(InvokeError::MissingClientToken { header }) => JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("missing access token in the '{header}' header"),
            ),
            Err(InvokeError::NotAuthorized) => {
                JsonRpcResponse::error(id, INVALID_REQUEST, UNAUTHORIZED_TOOL_CALL)
            }
            Err(InvokeError::Params(e)) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string())
            }
            Err(InvokeError::Tool(ToolError::Unauthorized(message))) => {
                JsonRpcResponse::error(id, INVALID_REQUEST, message)
            }
            Err(InvokeError::Tool(e)) => respond(id, &CallToolResult::error(e.to_string())),
        }
    }

    fn handle_list_prompts(&self, id: Option<Value>) -> JsonRpcResponse {
        let prompts = self
            .resources
            .get_promptset(DEFAULT_PROMPTSET)
            .map(|set| set.mcp_manifests())
            .unwrap_or_default();
        respond(id, &ListPromptsResult { prompts })
    }

    fn handle_get_prompt(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        ctx: &RequestContext,
    ) -> JsonRpcResponse {
        let params: GetPromptParams = match decode_params(params) {
            Ok(params) => params,
            Err(message) => return JsonRpcResponse::error(id, INVALID_PARAMS, message),
        };
        let Some(prompt) = self.resources.get_prompt(&params.name) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("invalid prompt name: prompt with name \"{}\" does not exist", params.name),
            );
        };

        let messages = prompt
            .parse_args(&params.arguments, &ctx.claims)
            .and_then(|values| prompt.substitute_params(&values));
        match messages {
            Ok(messages) => respond(
                id,
                &GetPromptResult {
                    description: prompt.description().to_string(),
                    messages: messages.into_iter().map(McpPromptMessage::from).collect(),
                },
            ),
            Err(e) => JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
        }
    }

    /// Serves newline-delimited JSON-RPC on stdin/stdout until EOF.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!("Starting MCP server with stdio transport");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve_lines(stdin, stdout, &RequestContext::default()).await
    }

    /// Line-oriented transport loop over any reader and writer.
    pub async fn serve_lines<R, W>(
        &self,
        reader: R,
        mut writer: W,
        ctx: &RequestContext,
    ) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_message(&line, DEFAULT_TOOLSET, ctx).await;
            let Some(response) = response else {
                continue;
            };
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    let params = params.ok_or_else(|| "Missing params".to_string())?;
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {e}"))
}

fn respond<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            let message = format!("unable to encode result: {e}");
            JsonRpcResponse::error(id, INTERNAL_ERROR, message)
        }
    }
}

/// One text item per row for array results, otherwise a single item.
fn call_result(value: &Value) -> CallToolResult {
    let content = match value {
        Value::Array(rows) => rows.iter().map(|row| TextContent::new(row.to_string())).collect(),
        other => vec![TextContent::new(other.to_string())],
    };
    CallToolResult {
        content,
        is_error: false,
    }
}

//! Per-call tool invocation: authorize, parse, invoke.
//!
//! Shared by the REST and MCP surfaces so both apply the same checks in the
//! same order.

use crate::auth::CallerIdentity;
use crate::error::ToolError;
use crate::parameters::ParamError;
use crate::tools::Tool;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Why an invocation did not produce a result.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The tool needs a client-delegated credential and none was sent.
    #[error("missing access token in the '{header}' header")]
    MissingClientToken { header: String },

    /// None of the tool's required auth services was verified.
    #[error("tool invocation not authorized")]
    NotAuthorized,

    /// Caller input failed parameter validation.
    #[error(transparent)]
    Params(#[from] ParamError),

    /// The tool ran and failed.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Runs one invocation of `tool` for `caller`.
///
/// Checks run in a fixed order: client credential presence, authorization,
/// parameter parsing. The backend is only reached when all pass. With a
/// `timeout`, an invocation exceeding it is dropped and reported as an
/// execution error.
pub async fn invoke_tool(
    tool: &dyn Tool,
    args: &Map<String, Value>,
    caller: &CallerIdentity,
    timeout: Option<Duration>,
) -> Result<Value, InvokeError> {
    if tool.requires_client_authorization() && !caller.access_token.is_present() {
        return Err(InvokeError::MissingClientToken {
            header: tool.auth_token_header_name().to_string(),
        });
    }

    if !tool.authorized(&caller.verified_services()) {
        tracing::debug!(tool = %tool.name(), "caller lacks a required auth service");
        return Err(InvokeError::NotAuthorized);
    }

    let params = tool.parse_params(args, &caller.claims)?;

    tracing::debug!(
        tool = %tool.name(),
        kind = %tool.kind(),
        params = params.len(),
        "invoking tool"
    );
    let call = tool.invoke(params, &caller.access_token);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::execution(
                "tool invocation timed out",
                anyhow::anyhow!("no result after {limit:?}"),
            )),
        },
        None => call.await,
    };

    if let Err(e) = &result {
        tracing::warn!(
            tool = %tool.name(),
            kind = %tool.kind(),
            error = %e,
            "tool invocation failed"
        );
    }
    Ok(result?)
}

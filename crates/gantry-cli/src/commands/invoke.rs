//! `gantry invoke <tool> [params]`: one local invocation without a server.
//!
//! No request headers exist here, so parameters are parsed without claims and
//! tools that need the caller's own credential are refused.

use super::{ToolsArgs, registries};
use anyhow::{Context, Result, bail};
use clap::Args;
use gantry_core::{CallerIdentity, invoke_tool};
use serde_json::{Map, Value};

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Name of the tool to invoke.
    pub tool: String,

    /// Parameters as a JSON object, e.g. '{"id": 1}'.
    pub params: Option<String>,

    #[command(flatten)]
    pub tools: ToolsArgs,
}

impl InvokeArgs {
    fn arguments(&self) -> Result<Map<String, Value>> {
        let raw = match self.params.as_deref().map(str::trim) {
            None | Some("") => return Ok(Map::new()),
            Some(raw) => raw,
        };
        match serde_json::from_str(raw).context("params are not valid JSON")? {
            Value::Object(map) => Ok(map),
            other => bail!("params must be a JSON object, got {other}"),
        }
    }
}

pub async fn run(args: &InvokeArgs) -> Result<Value> {
    let arguments = args.arguments()?;
    let set = args.tools.server_config().load_resources(&registries()?).await?;

    let result = match set.tools.get(&args.tool) {
        None => Err(anyhow::anyhow!("tool \"{}\" does not exist", args.tool)),
        Some(tool) if tool.requires_client_authorization() => Err(anyhow::anyhow!(
            "tool \"{}\" requires client authorization and cannot be invoked from the command line",
            args.tool
        )),
        Some(tool) => invoke_tool(tool.as_ref(), &arguments, &CallerIdentity::anonymous(), None)
            .await
            .map_err(anyhow::Error::from),
    };

    set.close().await;
    result.with_context(|| format!("invoking {}", args.tool))
}

//! `gantry validate`: full decode and initialize, then a summary.

use super::{ToolsArgs, registries};
use anyhow::Result;
use gantry_core::ResourceSet;

pub async fn run(args: &ToolsArgs) -> Result<String> {
    let set = args.server_config().load_resources(&registries()?).await?;
    let summary = summarize(&set);
    set.close().await;
    Ok(summary)
}

fn summarize(set: &ResourceSet) -> String {
    // The implicit default toolset and promptset are not counted.
    let toolsets = set.toolsets.keys().filter(|name| !name.is_empty()).count();
    let promptsets = set.promptsets.keys().filter(|name| !name.is_empty()).count();
    format!(
        "Configuration is valid: {} sources, {} auth services, {} tools, {} toolsets, \
         {} prompts, {} promptsets",
        set.sources.len(),
        set.auth_services.len(),
        set.tools.len(),
        toolsets,
        set.prompts.len(),
        promptsets,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{TOOLS_YAML, tools_args};

    #[tokio::test]
    async fn test_validate_summary() {
        let (_dir, args) = tools_args(TOOLS_YAML);
        assert_eq!(
            run(&args).await.unwrap(),
            "Configuration is valid: 1 sources, 1 auth services, 2 tools, 1 toolsets, \
             0 prompts, 0 promptsets"
        );
    }

    #[tokio::test]
    async fn test_validate_reports_initialization_errors() {
        let (_dir, args) = tools_args(
            "tools:\n  t:\n    kind: sqlite-sql\n    source: nowhere\n    description: x\n    \
             statement: SELECT 1\n",
        );
        let err = run(&args).await.unwrap_err();
        assert!(err.to_string().contains("nowhere"), "{err}");
    }
}

//! Toolsets: named, ordered views over the tool registry.

use crate::error::ConfigError;
use crate::tools::{Manifest, McpManifest, Tool, ToolMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the toolset that always contains every tool.
pub const DEFAULT_TOOLSET: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsetConfig {
    pub name: String,
    pub tool_names: Vec<String>,
}

impl ToolsetConfig {
    pub fn new(name: impl Into<String>, tool_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tool_names,
        }
    }

    /// Resolves every tool name; an unknown name fails construction.
    pub fn initialize(
        &self,
        server_version: &str,
        tools: &ToolMap,
    ) -> Result<Toolset, ConfigError> {
        let mut resolved = Vec::with_capacity(self.tool_names.len());
        let mut manifests = BTreeMap::new();
        for tool_name in &self.tool_names {
            let tool = tools
                .get(tool_name)
                .ok_or_else(|| ConfigError::UnknownReference {
                    what: "toolset",
                    name: self.name.clone(),
                    target: "tool",
                    reference: tool_name.clone(),
                })?;
            manifests.insert(tool_name.clone(), tool.manifest());
            resolved.push(Arc::clone(tool));
        }
        Ok(Toolset {
            name: self.name.clone(),
            tools: resolved,
            manifest: ToolsetManifest {
                server_version: server_version.to_string(),
                tools: manifests,
            },
        })
    }
}

/// `{serverVersion, tools}` document served by `GET /api/toolset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsetManifest {
    pub server_version: String,
    pub tools: BTreeMap<String, Manifest>,
}

pub struct Toolset {
    pub name: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub manifest: ToolsetManifest,
}

impl Toolset {
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == tool_name)
    }

    pub fn mcp_manifests(&self) -> Vec<McpManifest> {
        self.tools.iter().map(|t| t.mcp_manifest()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameter;
    use crate::tools::testing::EchoTool;

    fn tools() -> ToolMap {
        let mut map = ToolMap::new();
        for name in ["a", "b"] {
            map.insert(
                name.to_string(),
                Arc::new(EchoTool::new(name, vec![Parameter::integer("id", "")])) as Arc<dyn Tool>,
            );
        }
        map
    }

    #[test]
    fn test_initialize_keeps_order() {
        let config = ToolsetConfig::new("mine", vec!["b".into(), "a".into()]);
        let toolset = config.initialize("1.0.0", &tools()).unwrap();
        assert_eq!(toolset.tool_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(toolset.contains("a"));
        assert_eq!(toolset.manifest.server_version, "1.0.0");
        assert_eq!(toolset.manifest.tools.len(), 2);
        assert_eq!(toolset.mcp_manifests()[0].name, "b");
    }

    #[test]
    fn test_unknown_tool_fails() {
        let config = ToolsetConfig::new("mine", vec!["missing".into()]);
        let err = config.initialize("1.0.0", &tools()).err().unwrap();
        assert_eq!(
            err.to_string(),
            "toolset \"mine\" references unknown tool \"missing\""
        );
    }

    #[test]
    fn test_manifest_json_shape() {
        let config = ToolsetConfig::new("mine", vec!["a".into()]);
        let toolset = config.initialize("1.0.0", &tools()).unwrap();
        let value = serde_json::to_value(&toolset.manifest).unwrap();
        assert_eq!(value["serverVersion"], "1.0.0");
        assert_eq!(value["tools"]["a"]["parameters"][0]["name"], "id");
    }
}

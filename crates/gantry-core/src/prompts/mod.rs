//! Prompts: parameterized message templates served over MCP.

pub mod custom;

use crate::auth::ClaimsMap;
use crate::error::ConfigError;
use crate::parameters::{ParamError, ParamValues, Parameter, ParameterManifest, ParameterType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Name of the promptset that always contains every prompt.
pub const DEFAULT_PROMPTSET: &str = "";

/// Decoded, kind-specific prompt configuration.
pub trait PromptConfig: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn name(&self) -> &str;

    fn initialize(&self) -> Result<Arc<dyn Prompt>, ConfigError>;
}

pub trait Prompt: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn arguments(&self) -> &[Parameter];

    /// Renders the prompt's messages with resolved argument values.
    fn substitute_params(&self, values: &ParamValues) -> Result<Vec<PromptMessage>, ParamError>;

    fn parse_args(
        &self,
        args: &Map<String, Value>,
        claims: &ClaimsMap,
    ) -> Result<ParamValues, ParamError> {
        crate::parameters::parse_params(self.arguments(), args, claims)
    }

    fn manifest(&self) -> PromptManifest {
        PromptManifest {
            description: self.description().to_string(),
            arguments: self.arguments().iter().map(Parameter::manifest).collect(),
        }
    }

    fn mcp_manifest(&self) -> McpPromptManifest {
        McpPromptManifest {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments: self
                .arguments()
                .iter()
                .map(|arg| McpPromptArgument {
                    name: arg.name.clone(),
                    description: arg.description.clone(),
                    required: arg.is_required(),
                })
                .collect(),
        }
    }
}

/// Initialized prompts keyed by name.
pub type PromptMap = HashMap<String, Arc<dyn Prompt>>;

/// Message author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptMessage {
    #[serde(default)]
    pub role: Role,
    pub content: String,
}

/// A prompt argument as declared in YAML. Unlike tool parameters the type
/// is optional and defaults to `string`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PromptArgument {
    pub name: String,
    #[serde(rename = "type", default = "default_argument_type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Parameter>>,
}

fn default_argument_type() -> ParameterType {
    ParameterType::String
}

impl PromptArgument {
    pub fn to_parameter(&self) -> Parameter {
        let mut param = Parameter::new(self.name.clone(), self.kind, self.description.clone());
        param.required = self.required;
        param.default = self.default.clone();
        param.items = self.items.clone();
        param
    }
}

/// Prompt entry of `GET /api/promptset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptManifest {
    pub description: String,
    pub arguments: Vec<ParameterManifest>,
}

/// A prompt as listed by MCP `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPromptManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<McpPromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsetConfig {
    pub name: String,
    pub prompt_names: Vec<String>,
}

impl PromptsetConfig {
    pub fn new(name: impl Into<String>, prompt_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            prompt_names,
        }
    }

    pub fn initialize(
        &self,
        server_version: &str,
        prompts: &PromptMap,
    ) -> Result<Promptset, ConfigError> {
        let mut resolved = Vec::with_capacity(self.prompt_names.len());
        let mut manifests = BTreeMap::new();
        for prompt_name in &self.prompt_names {
            let prompt = prompts
                .get(prompt_name)
                .ok_or_else(|| ConfigError::UnknownReference {
                    what: "promptset",
                    name: self.name.clone(),
                    target: "prompt",
                    reference: prompt_name.clone(),
                })?;
            manifests.insert(prompt_name.clone(), prompt.manifest());
            resolved.push(Arc::clone(prompt));
        }
        Ok(Promptset {
            name: self.name.clone(),
            prompts: resolved,
            manifest: PromptsetManifest {
                server_version: server_version.to_string(),
                prompts: manifests,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsetManifest {
    pub server_version: String,
    pub prompts: BTreeMap<String, PromptManifest>,
}

pub struct Promptset {
    pub name: String,
    pub prompts: Vec<Arc<dyn Prompt>>,
    pub manifest: PromptsetManifest,
}

impl Promptset {
    pub fn mcp_manifests(&self) -> Vec<McpPromptManifest> {
        self.prompts.iter().map(|p| p.mcp_manifest()).collect()
    }
}

//! Tools: invokable operations bound to a source.

use crate::auth::{AccessToken, ClaimsMap};
use crate::error::{ConfigError, ToolError};
use crate::parameters::{
    self, McpToolsSchema, ParamError, ParamValues, ParameterManifest, Parameters,
};
use crate::sources::SourceMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Header carrying the client-delegated credential unless a tool says
/// otherwise.
pub const DEFAULT_AUTH_TOKEN_HEADER: &str = "Authorization";

/// Decoded, kind-specific tool configuration.
pub trait ToolConfig: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn name(&self) -> &str;

    /// Binds the tool to its source and fixes its parameters.
    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError>;
}

/// One invokable operation.
///
/// Implementations must tolerate unbounded concurrent `invoke` calls.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &str;

    fn description(&self) -> &str;

    /// Every parameter the tool accepts, template parameters included.
    fn parameters(&self) -> &Parameters;

    /// Auth services of which at least one must be verified to invoke.
    fn auth_required(&self) -> &[String];

    fn annotations(&self) -> Option<&ToolAnnotations> {
        None
    }

    /// Runs the backend operation once.
    async fn invoke(
        &self,
        params: ParamValues,
        access_token: &AccessToken,
    ) -> Result<Value, ToolError>;

    fn parse_params(
        &self,
        data: &Map<String, Value>,
        claims: &ClaimsMap,
    ) -> Result<ParamValues, ParamError> {
        parameters::parse_params(self.parameters(), data, claims)
    }

    fn manifest(&self) -> Manifest {
        Manifest {
            description: self.description().to_string(),
            parameters: self.parameters().manifest(),
            auth_required: self.auth_required().to_vec(),
        }
    }

    fn mcp_manifest(&self) -> McpManifest {
        let (input_schema, auth_params) = self.parameters().mcp_manifest();
        let meta = McpToolMeta {
            auth_invoke: self.auth_required().to_vec(),
            auth_params,
        };
        McpManifest {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema,
            annotations: self.annotations().cloned(),
            meta: (!meta.is_empty()).then_some(meta),
        }
    }

    fn authorized(&self, verified_auth_services: &[String]) -> bool {
        is_authorized(self.auth_required(), verified_auth_services)
    }

    /// Whether `invoke` derives backend credentials from the caller's token.
    fn requires_client_authorization(&self) -> bool {
        false
    }

    fn auth_token_header_name(&self) -> &str {
        DEFAULT_AUTH_TOKEN_HEADER
    }
}

impl fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// True when `auth_required` is empty or any of its services was verified.
pub fn is_authorized(auth_required: &[String], verified_auth_services: &[String]) -> bool {
    auth_required.is_empty()
        || auth_required
            .iter()
            .any(|required| verified_auth_services.contains(required))
}

/// Initialized tools keyed by name.
pub type ToolMap = std::collections::HashMap<String, Arc<dyn Tool>>;

/// Public schema of a tool (`GET /api/tool/{name}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub description: String,
    pub parameters: Vec<ParameterManifest>,
    pub auth_required: Vec<String>,
}

/// MCP behaviour hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// A tool as listed by MCP `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpManifest {
    pub name: String,
    pub description: String,
    pub input_schema: McpToolsSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<McpToolMeta>,
}

/// Auth metadata attached to an MCP tool manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpToolMeta {
    #[serde(rename = "toolbox/authInvoke", default, skip_serializing_if = "Vec::is_empty")]
    pub auth_invoke: Vec<String>,
    #[serde(rename = "toolbox/authParams", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auth_params: BTreeMap<String, Vec<String>>,
}

impl McpToolMeta {
    pub fn is_empty(&self) -> bool {
        self.auth_invoke.is_empty() && self.auth_params.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::parameters::Parameter;

    /// Echoes its parsed parameters back as a JSON object.
    pub struct EchoTool {
        pub name: String,
        pub parameters: Parameters,
        pub auth_required: Vec<String>,
        pub client_auth: bool,
    }

    impl EchoTool {
        pub fn new(name: &str, parameters: Vec<Parameter>) -> Self {
            Self {
                name: name.to_string(),
                parameters: parameters.into(),
                auth_required: Vec::new(),
                client_auth: false,
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes its parameters"
        }

        fn parameters(&self) -> &Parameters {
            &self.parameters
        }

        fn auth_required(&self) -> &[String] {
            &self.auth_required
        }

        async fn invoke(
            &self,
            params: ParamValues,
            access_token: &AccessToken,
        ) -> Result<Value, ToolError> {
            if self.client_auth {
                access_token
                    .parse_bearer_token()
                    .map_err(|e| ToolError::Unauthorized(e.to_string()))?;
            }
            if params.get("fail").and_then(Value::as_bool) == Some(true) {
                return Err(ToolError::execution(
                    "unable to execute query",
                    anyhow::anyhow!("backend exploded"),
                ));
            }
            Ok(Value::Object(params.as_map()))
        }

        fn requires_client_authorization(&self) -> bool {
            self.client_auth
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::EchoTool;
    use super::*;
    use crate::parameters::{ParamAuthService, Parameter};
    use serde_json::json;

    #[test]
    fn test_authorized() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(is_authorized(&[], &[]));
        assert!(is_authorized(&[], &names(&["google"])));
        assert!(is_authorized(&names(&["google"]), &names(&["google"])));
        assert!(!is_authorized(&names(&["google"]), &[]));
        assert!(!is_authorized(&names(&["google"]), &names(&["github"])));
        assert!(is_authorized(&names(&["google", "github"]), &names(&["github"])));
    }

    #[test]
    fn test_manifest() {
        let mut tool = EchoTool::new("echo", vec![Parameter::integer("id", "row id")]);
        tool.auth_required = vec!["my-jwt".into()];
        let manifest = serde_json::to_value(tool.manifest()).unwrap();
        assert_eq!(
            manifest,
            json!({
                "description": "echoes its parameters",
                "parameters": [{
                    "name": "id",
                    "type": "integer",
                    "required": true,
                    "description": "row id",
                    "authSources": []
                }],
                "authRequired": ["my-jwt"]
            })
        );
    }

    #[test]
    fn test_mcp_manifest_meta() {
        let plain = EchoTool::new("plain", vec![Parameter::string("q", "query")]);
        let value = serde_json::to_value(plain.mcp_manifest()).unwrap();
        assert!(value.get("_meta").is_none());
        assert_eq!(value["inputSchema"]["required"], json!(["q"]));

        let mut bound = EchoTool::new(
            "bound",
            vec![Parameter::string("email", "")
                .with_auth_services(vec![ParamAuthService::new("my-jwt", "email")])],
        );
        bound.auth_required = vec!["my-jwt".into()];
        let value = serde_json::to_value(bound.mcp_manifest()).unwrap();
        assert_eq!(
            value["_meta"],
            json!({
                "toolbox/authInvoke": ["my-jwt"],
                "toolbox/authParams": {"email": ["my-jwt"]}
            })
        );
    }

    #[tokio::test]
    async fn test_invoke_round_trip() {
        let tool = EchoTool::new("echo", vec![Parameter::integer("id", "")]);
        let data = json!({"id": 3}).as_object().cloned().unwrap();
        let params = tool.parse_params(&data, &ClaimsMap::new()).unwrap();
        let result = tool.invoke(params, &AccessToken::none()).await.unwrap();
        assert_eq!(result, json!({"id": 3}));
    }
}

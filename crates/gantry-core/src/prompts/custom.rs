//! The built-in `custom` prompt kind.
//!
//! ```yaml
//! prompts:
//!   code_review:
//!     description: Asks the model to review code
//!     messages:
//!       - role: user
//!         content: "Please review the following {{.language}} code: {{.code}}"
//!     arguments:
//!       - name: language
//!       - name: code
//! ```

use super::{Prompt, PromptArgument, PromptConfig, PromptMessage};
use crate::error::ConfigError;
use crate::parameters::{ParamError, ParamValues, Parameter, Parameters, resolve_template_params};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "custom";

/// Factory registered for [`KIND`].
pub fn decode(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn PromptConfig>, serde_yaml::Error> {
    let mut config: CustomPromptConfig = serde_yaml::from_value(value)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomPromptConfig {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub messages: Vec<PromptMessage>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

impl PromptConfig for CustomPromptConfig {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> Result<Arc<dyn Prompt>, ConfigError> {
        if self.messages.is_empty() {
            return Err(ConfigError::Invalid {
                what: "prompt",
                name: self.name.clone(),
                reason: "at least one message is required".to_string(),
            });
        }
        let arguments: Parameters = self
            .arguments
            .iter()
            .map(PromptArgument::to_parameter)
            .collect();
        arguments.validate().map_err(|source| ConfigError::Parameter {
            what: "prompt",
            name: self.name.clone(),
            source,
        })?;
        Ok(Arc::new(CustomPrompt {
            name: self.name.clone(),
            description: self.description.clone(),
            messages: self.messages.clone(),
            arguments,
        }))
    }
}

pub struct CustomPrompt {
    name: String,
    description: String,
    messages: Vec<PromptMessage>,
    arguments: Parameters,
}

impl Prompt for CustomPrompt {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn arguments(&self) -> &[Parameter] {
        &self.arguments
    }

    fn substitute_params(&self, values: &ParamValues) -> Result<Vec<PromptMessage>, ParamError> {
        let mut bound = values.as_map();
        for arg in self.arguments.iter() {
            bound
                .entry(arg.name.clone())
                .or_insert_with(|| Value::String(String::new()));
        }
        self.messages
            .iter()
            .map(|message| {
                Ok(PromptMessage {
                    role: message.role,
                    content: resolve_template_params(&self.arguments, &message.content, &bound)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ClaimsMap;
    use crate::prompts::Role;
    use serde_json::json;

    fn config(yaml: &str) -> Box<dyn PromptConfig> {
        decode("code_review", serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    const YAML: &str = r#"
description: Asks the model to review code
messages:
  - content: "Review this {{.language}} code: {{.code}}"
  - role: assistant
    content: "Sure."
arguments:
  - name: language
    description: Programming language
  - name: code
"#;

    #[test]
    fn test_decode_and_manifest() {
        let prompt = config(YAML).initialize().unwrap();
        let manifest = serde_json::to_value(prompt.mcp_manifest()).unwrap();
        assert_eq!(
            manifest,
            json!({
                "name": "code_review",
                "description": "Asks the model to review code",
                "arguments": [
                    {"name": "language", "description": "Programming language", "required": true},
                    {"name": "code", "required": true}
                ]
            })
        );
        assert_eq!(prompt.manifest().arguments[0].kind, "string");
    }

    #[test]
    fn test_substitute() {
        let prompt = config(YAML).initialize().unwrap();
        let args = json!({"language": "rust", "code": "fn main() {}"});
        let values = prompt
            .parse_args(args.as_object().unwrap(), &ClaimsMap::new())
            .unwrap();
        let messages = prompt.substitute_params(&values).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Review this rust code: fn main() {}");
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_missing_argument() {
        let prompt = config(YAML).initialize().unwrap();
        let args = json!({"language": "rust"});
        let err = prompt
            .parse_args(args.as_object().unwrap(), &ClaimsMap::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "parameter \"code\" is required");
    }

    #[test]
    fn test_invalid_role_rejected() {
        let yaml = "messages:\n  - role: system\n    content: hi\n";
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert!(decode("p", value).is_err());
    }

    #[test]
    fn test_no_messages_rejected() {
        let yaml = "messages: []\n";
        assert!(config(yaml).initialize().is_err());
    }
}

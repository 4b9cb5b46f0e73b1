use super::RawConfig;
use crate::auth::AuthServiceConfig;
use crate::error::ConfigError;
use crate::prompts::{self, DEFAULT_PROMPTSET, PromptConfig, PromptsetConfig};
use crate::registry::{Factory, KindRegistry, Registries};
use crate::sources::SourceConfig;
use crate::tools::ToolConfig;
use crate::toolsets::{DEFAULT_TOOLSET, ToolsetConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Kind-specific configs for every declared resource.
#[derive(Debug, Default, Clone)]
pub struct ResourceConfigs {
    pub sources: BTreeMap<String, Arc<dyn SourceConfig>>,
    pub auth_services: BTreeMap<String, Arc<dyn AuthServiceConfig>>,
    pub tools: BTreeMap<String, Arc<dyn ToolConfig>>,
    pub toolsets: BTreeMap<String, ToolsetConfig>,
    pub prompts: BTreeMap<String, Arc<dyn PromptConfig>>,
    pub promptsets: BTreeMap<String, PromptsetConfig>,
}

/// Decodes every entry of `raw` through the factory registered for its
/// `kind`.
pub fn decode(raw: RawConfig, registries: &Registries) -> Result<ResourceConfigs, ConfigError> {
    let mut configs = ResourceConfigs::default();

    for (name, value) in raw.sources {
        let config = decode_entry("source", &name, value, &registries.sources, None)?;
        configs.sources.insert(name, Arc::from(config));
    }
    for (name, value) in raw.auth_services {
        let config = decode_entry("authService", &name, value, &registries.auth_services, None)?;
        configs.auth_services.insert(name, Arc::from(config));
    }
    for (name, value) in raw.tools {
        let config = decode_entry("tool", &name, value, &registries.tools, None)?;
        configs.tools.insert(name, Arc::from(config));
    }
    for (name, value) in raw.prompts {
        let config = decode_entry(
            "prompt",
            &name,
            value,
            &registries.prompts,
            Some(prompts::custom::KIND),
        )?;
        configs.prompts.insert(name, Arc::from(config));
    }

    for (name, tool_names) in raw.toolsets {
        if name == DEFAULT_TOOLSET {
            return Err(reserved_name("toolset"));
        }
        configs
            .toolsets
            .insert(name.clone(), ToolsetConfig::new(name, tool_names));
    }
    for (name, prompt_names) in raw.promptsets {
        if name == DEFAULT_PROMPTSET {
            return Err(reserved_name("promptset"));
        }
        configs
            .promptsets
            .insert(name.clone(), PromptsetConfig::new(name, prompt_names));
    }

    Ok(configs)
}

fn reserved_name(what: &'static str) -> ConfigError {
    ConfigError::Invalid {
        what,
        name: String::new(),
        reason: "the empty name is reserved for the default set".to_string(),
    }
}

fn decode_entry<C: ?Sized>(
    what: &'static str,
    name: &str,
    value: serde_yaml::Value,
    registry: &KindRegistry<Factory<C>>,
    default_kind: Option<&str>,
) -> Result<Box<C>, ConfigError> {
    let serde_yaml::Value::Mapping(mut mapping) = value else {
        return Err(ConfigError::Invalid {
            what,
            name: name.to_string(),
            reason: "expected a mapping".to_string(),
        });
    };

    let kind = match mapping.remove("kind") {
        Some(serde_yaml::Value::String(kind)) => kind,
        Some(_) => {
            return Err(ConfigError::Invalid {
                what,
                name: name.to_string(),
                reason: "'kind' must be a string".to_string(),
            });
        }
        None => match default_kind {
            Some(kind) => kind.to_string(),
            None => {
                return Err(ConfigError::MissingKind {
                    what,
                    name: name.to_string(),
                });
            }
        },
    };

    let factory = registry
        .lookup(&kind)
        .ok_or_else(|| ConfigError::UnknownKind {
            what,
            name: name.to_string(),
            kind: kind.clone(),
        })?;

    factory(name, serde_yaml::Value::Mapping(mapping)).map_err(|source| ConfigError::Decode {
        what,
        name: name.to_string(),
        kind,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Source;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct FakeSourceConfig {
        #[serde(skip)]
        name: String,
        database: String,
    }

    #[async_trait]
    impl SourceConfig for FakeSourceConfig {
        fn kind(&self) -> &str {
            "fake"
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
            anyhow::bail!("not connecting to {}", self.database)
        }
    }

    fn fake_factory(
        name: &str,
        value: serde_yaml::Value,
    ) -> Result<Box<dyn SourceConfig>, serde_yaml::Error> {
        let mut config: FakeSourceConfig = serde_yaml::from_value(value)?;
        config.name = name.to_string();
        Ok(Box::new(config))
    }

    fn registries() -> Registries {
        let mut registries = Registries::new();
        registries.sources.register("fake", fake_factory);
        registries
    }

    fn raw(yaml: &str) -> RawConfig {
        RawConfig::from_yaml("test", yaml).unwrap()
    }

    #[test]
    fn test_decode_source() {
        let raw = raw("sources:\n  db:\n    kind: fake\n    database: x\n");
        let configs = decode(raw, &registries()).unwrap();
        let source = &configs.sources["db"];
        assert_eq!(source.kind(), "fake");
        assert_eq!(source.name(), "db");
    }

    #[test]
    fn test_missing_kind() {
        let err = decode(raw("sources:\n  db:\n    database: x\n"), &registries()).unwrap_err();
        assert_eq!(err.to_string(), "missing 'kind' field for source \"db\"");
    }

    #[test]
    fn test_unknown_kind() {
        let err = decode(raw("sources:\n  db:\n    kind: oracle\n"), &registries()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKind { .. }));
    }

    #[test]
    fn test_unknown_field_reports_name_and_kind() {
        let err = decode(
            raw("sources:\n  db:\n    kind: fake\n    database: x\n    color: red\n"),
            &registries(),
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("unable to parse source \"db\" as kind \"fake\": "));
    }

    #[test]
    fn test_missing_required_field() {
        let err = decode(raw("sources:\n  db:\n    kind: fake\n"), &registries()).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_prompt_kind_defaults_to_custom() {
        let configs = decode(
            raw("prompts:\n  greet:\n    messages:\n      - content: hi\n"),
            &registries(),
        )
        .unwrap();
        assert_eq!(configs.prompts["greet"].kind(), "custom");
    }

    #[test]
    fn test_reserved_toolset_name() {
        let err = decode(raw("toolsets:\n  \"\": [a]\n"), &registries()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { what: "toolset", .. }));
    }
}

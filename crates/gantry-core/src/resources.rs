//! Initialized resources and the manager that serves them.
//!
//! [`initialize_resources`] turns decoded configs into live sources, auth
//! services, tools, toolsets, prompts and promptsets, in that order. The
//! resulting [`ResourceSet`] is immutable; [`ResourceManager`] hands out
//! snapshots of it and swaps in a whole new set on reload.

use crate::auth::AuthService;
use crate::config::ResourceConfigs;
use crate::error::ConfigError;
use crate::prompts::{DEFAULT_PROMPTSET, Prompt, PromptMap, Promptset, PromptsetConfig};
use crate::sources::SourceMap;
use crate::tools::{Tool, ToolMap};
use crate::toolsets::{DEFAULT_TOOLSET, Toolset, ToolsetConfig};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Every live resource of one configuration generation.
#[derive(Default)]
pub struct ResourceSet {
    pub configs: ResourceConfigs,
    pub sources: SourceMap,
    pub auth_services: BTreeMap<String, Arc<dyn AuthService>>,
    pub tools: ToolMap,
    pub toolsets: HashMap<String, Arc<Toolset>>,
    pub prompts: PromptMap,
    pub promptsets: HashMap<String, Arc<Promptset>>,
}

impl ResourceSet {
    /// Sorted tool names.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Closes every source.
    pub async fn close(&self) {
        for (name, source) in &self.sources {
            debug!(source = %name, "closing source");
            source.close().await;
        }
    }
}

/// Builds a [`ResourceSet`] from decoded configs.
///
/// Any failure aborts the whole set and names the offending resource;
/// sources opened before the failure are closed.
pub async fn initialize_resources(
    configs: ResourceConfigs,
    server_version: &str,
) -> Result<ResourceSet, ConfigError> {
    let mut set = ResourceSet::default();
    match populate(&mut set, &configs, server_version).await {
        Ok(()) => {
            set.configs = configs;
            Ok(set)
        }
        Err(e) => {
            set.close().await;
            Err(e)
        }
    }
}

async fn populate(
    set: &mut ResourceSet,
    configs: &ResourceConfigs,
    server_version: &str,
) -> Result<(), ConfigError> {
    for (name, config) in &configs.sources {
        let source = config
            .initialize()
            .await
            .map_err(|source| ConfigError::Initialize {
                what: "source",
                name: name.clone(),
                source,
            })?;
        info!(source = %name, kind = %config.kind(), "initialized source");
        set.sources.insert(name.clone(), source);
    }

    for (name, config) in &configs.auth_services {
        let service = config
            .initialize()
            .await
            .map_err(|source| ConfigError::Initialize {
                what: "authService",
                name: name.clone(),
                source,
            })?;
        info!(auth_service = %name, kind = %config.kind(), "initialized auth service");
        set.auth_services.insert(name.clone(), service);
    }

    for (name, config) in &configs.tools {
        let tool = config
            .initialize(&set.sources)
            .map_err(|e| ConfigError::Initialize {
                what: "tool",
                name: name.clone(),
                source: e.into(),
            })?;
        warn_unknown_auth_services(tool.as_ref(), &set.auth_services);
        info!(tool = %name, kind = %config.kind(), "initialized tool");
        set.tools.insert(name.clone(), tool);
    }

    let mut toolset_configs: Vec<ToolsetConfig> = configs.toolsets.values().cloned().collect();
    toolset_configs.push(ToolsetConfig::new(DEFAULT_TOOLSET, set.tool_names()));
    for config in toolset_configs {
        let toolset = config.initialize(server_version, &set.tools)?;
        debug!(toolset = %config.name, tools = toolset.tools.len(), "initialized toolset");
        set.toolsets.insert(config.name, Arc::new(toolset));
    }

    for (name, config) in &configs.prompts {
        let prompt = config.initialize()?;
        info!(prompt = %name, kind = %config.kind(), "initialized prompt");
        set.prompts.insert(name.clone(), prompt);
    }

    let mut prompt_names: Vec<String> = set.prompts.keys().cloned().collect();
    prompt_names.sort();
    let mut promptset_configs: Vec<PromptsetConfig> =
        configs.promptsets.values().cloned().collect();
    promptset_configs.push(PromptsetConfig::new(DEFAULT_PROMPTSET, prompt_names));
    for config in promptset_configs {
        let promptset = config.initialize(server_version, &set.prompts)?;
        set.promptsets.insert(config.name, Arc::new(promptset));
    }

    Ok(())
}

fn warn_unknown_auth_services(
    tool: &dyn Tool,
    auth_services: &BTreeMap<String, Arc<dyn AuthService>>,
) {
    let bound = tool
        .parameters()
        .iter()
        .flat_map(|p| p.auth_services.iter().map(|a| &a.name));
    for service in tool.auth_required().iter().chain(bound) {
        if !auth_services.contains_key(service) {
            warn!(
                tool = %tool.name(),
                auth_service = %service,
                "tool references an unconfigured auth service"
            );
        }
    }
}

/// Thread-safe holder of the current [`ResourceSet`].
///
/// Readers take an `Arc` snapshot and never observe a half-built set;
/// reload replaces the whole set at once.
pub struct ResourceManager {
    current: RwLock<Arc<ResourceSet>>,
}

impl ResourceManager {
    pub fn new(set: ResourceSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
        }
    }

    pub fn snapshot(&self) -> Arc<ResourceSet> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Installs `set` and returns the one it replaced.
    pub fn replace(&self, set: ResourceSet) -> Arc<ResourceSet> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(set))
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.snapshot().tools.get(name).cloned()
    }

    pub fn get_toolset(&self, name: &str) -> Option<Arc<Toolset>> {
        self.snapshot().toolsets.get(name).cloned()
    }

    pub fn get_prompt(&self, name: &str) -> Option<Arc<dyn Prompt>> {
        self.snapshot().prompts.get(name).cloned()
    }

    pub fn get_promptset(&self, name: &str) -> Option<Arc<Promptset>> {
        self.snapshot().promptsets.get(name).cloned()
    }

    pub fn get_auth_services(&self) -> Vec<Arc<dyn AuthService>> {
        self.snapshot().auth_services.values().cloned().collect()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(ResourceSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameter;
    use crate::sources::testing::{MockHandle, MockSource};
    use crate::sources::{Source, SourceConfig, compatible_source};
    use crate::tools::ToolConfig;
    use crate::tools::testing::EchoTool;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct MockSourceConfig(String);

    #[async_trait]
    impl SourceConfig for MockSourceConfig {
        fn kind(&self) -> &str {
            "mock"
        }

        fn name(&self) -> &str {
            &self.0
        }

        async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
            Ok(Arc::new(MockSource::new(&self.0)))
        }
    }

    #[derive(Debug)]
    struct EchoToolConfig {
        name: String,
        source: String,
    }

    impl ToolConfig for EchoToolConfig {
        fn kind(&self) -> &str {
            "echo"
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError> {
            let _: MockHandle = compatible_source(sources, &self.source, "echo", &["mock"])?;
            Ok(Arc::new(EchoTool::new(&self.name, vec![Parameter::integer("id", "")])))
        }
    }

    fn configs(tool_source: &str) -> ResourceConfigs {
        let mut configs = ResourceConfigs::default();
        configs
            .sources
            .insert("db".into(), Arc::new(MockSourceConfig("db".into())));
        for name in ["b-tool", "a-tool"] {
            configs.tools.insert(
                name.into(),
                Arc::new(EchoToolConfig {
                    name: name.into(),
                    source: tool_source.into(),
                }),
            );
        }
        configs.toolsets.insert(
            "only-a".into(),
            ToolsetConfig::new("only-a", vec!["a-tool".into()]),
        );
        configs
    }

    #[tokio::test]
    async fn test_initialize_builds_default_toolset() {
        let set = initialize_resources(configs("db"), "0.1.0").await.unwrap();
        assert_eq!(set.tools.len(), 2);
        let default = &set.toolsets[DEFAULT_TOOLSET];
        assert_eq!(default.tool_names().collect::<Vec<_>>(), vec!["a-tool", "b-tool"]);
        assert_eq!(set.toolsets["only-a"].tools.len(), 1);
        assert!(set.promptsets.contains_key(DEFAULT_PROMPTSET));
    }

    #[tokio::test]
    async fn test_initialize_names_failing_tool() {
        let err = initialize_resources(configs("missing"), "0.1.0")
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "unable to initialize tool \"a-tool\": no source named \"missing\" configured"
        );
    }

    #[tokio::test]
    async fn test_unknown_toolset_member() {
        let mut configs = configs("db");
        configs.toolsets.insert(
            "broken".into(),
            ToolsetConfig::new("broken", vec!["nope".into()]),
        );
        let err = initialize_resources(configs, "0.1.0").await.err().unwrap();
        assert!(matches!(err, ConfigError::UnknownReference { .. }));
    }

    #[tokio::test]
    async fn test_manager_replace() {
        let manager = ResourceManager::default();
        assert!(manager.get_tool("a-tool").is_none());

        let before = manager.snapshot();
        let set = initialize_resources(configs("db"), "0.1.0").await.unwrap();
        manager.replace(set);

        assert!(manager.get_tool("a-tool").is_some());
        assert!(manager.get_toolset("only-a").is_some());
        // snapshots taken earlier keep seeing the old generation
        assert!(before.tools.is_empty());
    }
}

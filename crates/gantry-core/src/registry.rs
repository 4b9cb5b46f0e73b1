//! Kind registries.
//!
//! A registry maps a `kind` string to the factory that decodes that kind's
//! configuration. Registries are plain values assembled once by the binary
//! and passed by reference to config decoding.

use crate::auth::AuthServiceConfig;
use crate::error::ConfigError;
use crate::prompts::{self, PromptConfig};
use crate::sources::SourceConfig;
use crate::tools::ToolConfig;
use std::collections::BTreeMap;

/// Decodes a kind-specific configuration for the named resource.
pub type Factory<C> = fn(name: &str, value: serde_yaml::Value) -> Result<Box<C>, serde_yaml::Error>;

pub type SourceFactory = Factory<dyn SourceConfig>;
pub type ToolFactory = Factory<dyn ToolConfig>;
pub type AuthServiceFactory = Factory<dyn AuthServiceConfig>;
pub type PromptFactory = Factory<dyn PromptConfig>;

/// Kind → factory map for one resource family.
pub struct KindRegistry<F> {
    family: &'static str,
    factories: BTreeMap<String, F>,
}

impl<F: Copy> KindRegistry<F> {
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            factories: BTreeMap::new(),
        }
    }

    /// Stores `factory` under `kind`. Returns false if the kind is taken.
    pub fn register(&mut self, kind: impl Into<String>, factory: F) -> bool {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            return false;
        }
        self.factories.insert(kind, factory);
        true
    }

    /// Like [`register`](Self::register), reporting a taken kind as an error.
    pub fn try_register(&mut self, kind: &str, factory: F) -> Result<(), ConfigError> {
        if self.register(kind, factory) {
            Ok(())
        } else {
            Err(ConfigError::DuplicateKind {
                family: self.family,
                kind: kind.to_string(),
            })
        }
    }

    pub fn lookup(&self, kind: &str) -> Option<F> {
        self.factories.get(kind).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn family(&self) -> &'static str {
        self.family
    }
}

/// The four registries config decoding consults.
pub struct Registries {
    pub sources: KindRegistry<SourceFactory>,
    pub tools: KindRegistry<ToolFactory>,
    pub auth_services: KindRegistry<AuthServiceFactory>,
    pub prompts: KindRegistry<PromptFactory>,
}

impl Registries {
    /// Empty source, tool and auth registries; the prompt registry holds the
    /// built-in `custom` kind.
    pub fn new() -> Self {
        let mut prompt_kinds = KindRegistry::new("prompt");
        prompt_kinds.register(prompts::custom::KIND, prompts::custom::decode as PromptFactory);
        Self {
            sources: KindRegistry::new("source"),
            tools: KindRegistry::new("tool"),
            auth_services: KindRegistry::new("auth service"),
            prompts: prompt_kinds,
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

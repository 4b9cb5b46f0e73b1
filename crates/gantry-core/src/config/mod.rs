//! Declarative configuration.
//!
//! A configuration document is YAML with up to six top-level maps:
//!
//! ```yaml
//! sources:
//!   my-sqlite:
//!     kind: sqlite
//!     database: ./data.db
//! authServices:
//!   my-jwt:
//!     kind: jwt
//!     secret: ${JWT_SECRET}
//! tools:
//!   search-users:
//!     kind: sqlite-sql
//!     source: my-sqlite
//!     description: Find users by name
//!     statement: SELECT id, name FROM users WHERE name = ?
//!     parameters:
//!       - name: name
//!         type: string
//!         description: User name
//! toolsets:
//!   users: [search-users]
//! ```
//!
//! Loading is split in two steps. [`RawConfig`] holds each entry as untyped
//! YAML after `${ENV}` substitution and multi-file merging; [`decode`] then
//! dispatches every entry to the factory registered for its `kind`.

mod decode;
mod env;

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use decode::{ResourceConfigs, decode};
pub use env::substitute_env;

/// One or more merged configuration documents, entries not yet decoded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, serde_yaml::Value>,

    #[serde(default, alias = "authSources")]
    pub auth_services: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub tools: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub toolsets: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub prompts: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub promptsets: BTreeMap<String, Vec<String>>,
}

impl RawConfig {
    /// Parse one document. `origin` names it in error messages.
    pub fn from_yaml(origin: &str, content: &str) -> Result<Self, ConfigError> {
        let content = substitute_env(content)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&path.display().to_string(), &content)
    }

    /// Load and merge several files, in order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let mut merged = Self::default();
        for path in paths {
            merged.merge(Self::from_file(path)?)?;
        }
        Ok(merged)
    }

    /// Load and merge every `*.yaml`/`*.yml` file directly inside `dir`, in
    /// file-name order.
    pub fn from_folder(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_files(&yaml_files_in(dir.as_ref())?)
    }

    /// Moves every entry of `other` into `self`. A name defined in both is an
    /// error.
    pub fn merge(&mut self, other: RawConfig) -> Result<(), ConfigError> {
        merge_map(&mut self.sources, other.sources, "source")?;
        merge_map(&mut self.auth_services, other.auth_services, "authService")?;
        merge_map(&mut self.tools, other.tools, "tool")?;
        merge_map(&mut self.toolsets, other.toolsets, "toolset")?;
        merge_map(&mut self.prompts, other.prompts, "prompt")?;
        merge_map(&mut self.promptsets, other.promptsets, "promptset")?;
        Ok(())
    }
}

fn merge_map<V>(
    into: &mut BTreeMap<String, V>,
    from: BTreeMap<String, V>,
    what: &'static str,
) -> Result<(), ConfigError> {
    for (name, value) in from {
        if into.contains_key(&name) {
            return Err(ConfigError::DuplicateName { what, name });
        }
        into.insert(name, value);
    }
    Ok(())
}

/// The `*.yaml`/`*.yml` files directly inside `dir`, sorted.
pub fn yaml_files_in(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_yaml = path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

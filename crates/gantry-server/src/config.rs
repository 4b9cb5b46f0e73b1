//! Server settings and resource loading.

use gantry_core::config::decode;
use gantry_core::{
    ConfigError, RawConfig, Registries, ResourceSet, SERVER_VERSION, initialize_resources,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tools file read when neither files nor a folder are given.
pub const DEFAULT_TOOLS_FILE: &str = "tools.yaml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFormat {
    #[default]
    Standard,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1".
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Configuration documents, merged in order.
    #[serde(default)]
    pub tools_files: Vec<PathBuf>,

    /// Folder whose `*.yaml`/`*.yml` files are merged after `tools_files`.
    #[serde(default)]
    pub tools_folder: Option<PathBuf>,

    /// Serve MCP over stdin/stdout instead of HTTP.
    #[serde(default)]
    pub stdio: bool,

    #[serde(default)]
    pub disable_reload: bool,

    /// Upper bound on a single tool invocation.
    #[serde(default)]
    pub invoke_timeout: Option<Duration>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub logging_format: LoggingFormat,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            tools_files: Vec::new(),
            tools_folder: None,
            stdio: false,
            disable_reload: false,
            invoke_timeout: None,
            log_level: default_log_level(),
            logging_format: LoggingFormat::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Files given explicitly, or the default tools file when nothing was
    /// configured.
    pub fn effective_tools_files(&self) -> Vec<PathBuf> {
        if self.tools_files.is_empty() && self.tools_folder.is_none() {
            vec![PathBuf::from(DEFAULT_TOOLS_FILE)]
        } else {
            self.tools_files.clone()
        }
    }

    /// Reads and merges every configured document.
    pub fn load_raw_config(&self) -> Result<RawConfig, ConfigError> {
        let mut raw = RawConfig::from_files(&self.effective_tools_files())?;
        if let Some(folder) = &self.tools_folder {
            raw.merge(RawConfig::from_folder(folder)?)?;
        }
        Ok(raw)
    }

    /// Full pipeline: read, decode through `registries`, initialize.
    pub async fn load_resources(
        &self,
        registries: &Registries,
    ) -> Result<ResourceSet, ConfigError> {
        let configs = decode(self.load_raw_config()?, registries)?;
        initialize_resources(configs, SERVER_VERSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.effective_tools_files(), vec![PathBuf::from("tools.yaml")]);
        assert_eq!(config.logging_format, LoggingFormat::Standard);
    }

    #[test]
    fn test_files_and_folder_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("base.yaml");
        fs::write(&file, "toolsets:\n  a: []\n").unwrap();
        let folder = dir.path().join("more");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("b.yml"), "toolsets:\n  b: []\n").unwrap();

        let config = ServerConfig {
            tools_files: vec![file],
            tools_folder: Some(folder.clone()),
            ..Default::default()
        };
        let raw = config.load_raw_config().unwrap();
        assert_eq!(raw.toolsets.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        let folder_only = ServerConfig {
            tools_folder: Some(folder),
            ..Default::default()
        };
        assert!(folder_only.effective_tools_files().is_empty());
    }

    #[test]
    fn test_duplicate_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        fs::write(&a, "toolsets:\n  same: []\n").unwrap();
        fs::write(&b, "toolsets:\n  same: []\n").unwrap();
        let config = ServerConfig {
            tools_files: vec![a, b],
            ..Default::default()
        };
        let err = config.load_raw_config().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { what: "toolset", .. }));
    }
}

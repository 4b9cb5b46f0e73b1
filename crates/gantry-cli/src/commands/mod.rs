//! CLI command implementations.

pub mod invoke;
pub mod list;
pub mod serve;
pub mod validate;

use anyhow::Result;
use clap::Args;
use gantry_core::Registries;
use gantry_server::ServerConfig;
use std::path::PathBuf;

/// Where the tools configuration comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct ToolsArgs {
    /// Tools file; repeat to merge several. Defaults to `tools.yaml`.
    #[arg(long = "tools-file", value_name = "FILE")]
    pub tools_files: Vec<PathBuf>,

    /// Folder whose `*.yaml`/`*.yml` files are merged after the tools files.
    #[arg(long, value_name = "DIR")]
    pub tools_folder: Option<PathBuf>,
}

impl ToolsArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            tools_files: self.tools_files.clone(),
            tools_folder: self.tools_folder.clone(),
            ..Default::default()
        }
    }
}

/// Every source, tool and auth-service kind built into this binary.
pub fn registries() -> Result<Registries> {
    let mut registries = Registries::new();
    gantry_adapter_sql::register(&mut registries)?;
    gantry_auth::register(&mut registries)?;
    Ok(registries)
}

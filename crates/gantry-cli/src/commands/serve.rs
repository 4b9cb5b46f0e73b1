//! `gantry serve`: HTTP API and MCP endpoint, or MCP over stdio.

use super::{ToolsArgs, registries};
use anyhow::Result;
use clap::Args;
use gantry_server::{LoggingFormat, ServerConfig};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub tools: ToolsArgs,

    /// Address to bind.
    #[arg(long, short = 'a', default_value = "127.0.0.1")]
    pub address: String,

    #[arg(long, short = 'p', default_value_t = 5000)]
    pub port: u16,

    /// Speak MCP over stdin/stdout instead of HTTP.
    #[arg(long)]
    pub stdio: bool,

    /// Do not watch the tools files for changes.
    #[arg(long)]
    pub disable_reload: bool,

    /// Abandon a tool invocation after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub invoke_timeout: Option<u64>,
}

impl ServeArgs {
    fn server_config(&self, log_level: &str, logging_format: LoggingFormat) -> ServerConfig {
        ServerConfig {
            address: self.address.clone(),
            port: self.port,
            stdio: self.stdio,
            disable_reload: self.disable_reload,
            invoke_timeout: self.invoke_timeout.map(Duration::from_secs),
            log_level: log_level.to_string(),
            logging_format,
            ..self.tools.server_config()
        }
    }
}

pub async fn run(args: ServeArgs, log_level: &str, logging_format: LoggingFormat) -> Result<()> {
    let config = args.server_config(log_level, logging_format);
    gantry_server::run(config, Arc::new(registries()?)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_server_config_from_flags() {
        let args = ServeArgs {
            tools: ToolsArgs {
                tools_files: vec![PathBuf::from("tools.yaml")],
                tools_folder: Some(PathBuf::from("conf.d")),
            },
            address: "0.0.0.0".into(),
            port: 8080,
            stdio: false,
            disable_reload: true,
            invoke_timeout: Some(30),
        };
        let config = args.server_config("debug", LoggingFormat::Json);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.tools_folder, Some(PathBuf::from("conf.d")));
        assert_eq!(config.invoke_timeout, Some(Duration::from_secs(30)));
        assert!(config.disable_reload);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.logging_format, LoggingFormat::Json);
    }
}

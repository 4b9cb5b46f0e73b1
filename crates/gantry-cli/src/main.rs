use clap::{Parser, Subcommand, ValueEnum};
use gantry_server::LoggingFormat;

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "gantry", version, about = "Database tools over HTTP and MCP")]
struct Cli {
    /// Log level filter; `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, default_value = "info", env = "GANTRY_LOG_LEVEL")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Standard)]
    logging_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the configured tools over HTTP, or MCP over stdio.
    Serve(commands::serve::ServeArgs),

    /// Invoke one tool locally and print its result.
    Invoke(commands::invoke::InvokeArgs),

    /// Decode and initialize the configuration, then print a summary.
    Validate(commands::ToolsArgs),

    /// Decode the configuration and list resources by type.
    List(commands::ToolsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Standard,
    Json,
}

impl From<LogFormat> for LoggingFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Standard => LoggingFormat::Standard,
            LogFormat::Json => LoggingFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logging_format = LoggingFormat::from(cli.logging_format);
    logging::init(&cli.log_level, logging_format);

    match cli.cmd {
        Command::Serve(args) => commands::serve::run(args, &cli.log_level, logging_format).await?,
        Command::Invoke(args) => {
            let result = commands::invoke::run(&args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Validate(args) => println!("{}", commands::validate::run(&args).await?),
        Command::List(args) => println!("{}", commands::list::run(&args)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "gantry",
            "serve",
            "--tools-file",
            "a.yaml",
            "--tools-file",
            "b.yaml",
            "--port",
            "8080",
            "--stdio",
            "--disable-reload",
            "--logging-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.logging_format, LogFormat::Json);
        let Command::Serve(args) = cli.cmd else {
            panic!("expected serve");
        };
        assert_eq!(
            args.tools.tools_files,
            vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]
        );
        assert_eq!(args.port, 8080);
        assert_eq!(args.address, "127.0.0.1");
        assert!(args.stdio);
        assert!(args.disable_reload);
    }

    #[test]
    fn test_invoke_positional_params() {
        let cli = Cli::try_parse_from([
            "gantry",
            "invoke",
            "my-tool",
            r#"{"id": 1}"#,
            "--tools-file",
            "tools.yaml",
        ])
        .unwrap();
        let Command::Invoke(args) = cli.cmd else {
            panic!("expected invoke");
        };
        assert_eq!(args.tool, "my-tool");
        assert_eq!(args.params.as_deref(), Some(r#"{"id": 1}"#));
    }

    #[test]
    fn test_unknown_logging_format_is_rejected() {
        assert!(Cli::try_parse_from(["gantry", "list", "--logging-format", "xml"]).is_err());
    }
}

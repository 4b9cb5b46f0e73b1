use gantry_server::LoggingFormat;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so stdout stays free for
/// command output and the stdio transport.
pub fn init(level: &str, format: LoggingFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LoggingFormat::Standard => builder.init(),
        LoggingFormat::Json => builder.json().init(),
    }
}

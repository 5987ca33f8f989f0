use color_eyre::eyre::{eyre, Result};
use tracing_subscriber::EnvFilter;

use primus_config::{LogFormat, LogLevel, LoggingConfig};

/// Install the global subscriber.
///
/// `directives` wins over `RUST_LOG`, which wins over the configured level.
pub fn init(config: &LoggingConfig, directives: Option<&str>) -> Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directives(config.log_level)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match config.log_format {
        LogFormat::Plaintext => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| eyre!("Failed to install the logger: {e}"))
}

fn default_directives(level: LogLevel) -> String {
    match level {
        // Keep the HTTP stack quiet below info
        LogLevel::Trace | LogLevel::Debug => format!("{level},hyper=info,axum=info"),
        _ => level.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_per_level() {
        assert_eq!(default_directives(LogLevel::Info), "info");
        assert_eq!(default_directives(LogLevel::Error), "error");
        assert_eq!(default_directives(LogLevel::Debug), "debug,hyper=info,axum=info");
        assert!(EnvFilter::try_new(default_directives(LogLevel::Trace)).is_ok());
    }
}

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{LogLevel, LoggingConfig};

static INIT: Once = Once::new();

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Initialize logging system
///
/// Logs go to stderr (or the configured file) so they never mix with the
/// interactive menu on stdout. `RUST_LOG` overrides the configured level.
/// Only the first call installs a subscriber.
pub fn setup_logging(config: &LoggingConfig) -> Result<(), String> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = setup_logging_internal(config);
    });

    result
}

fn setup_logging_internal(config: &LoggingConfig) -> Result<(), String> {
    let level: Level = config.level.into();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if let Some(path) = &config.file_path {
        use std::fs::OpenOptions;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        subscriber
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .try_init()
            .map_err(|e| format!("Failed to set global subscriber: {}", e))?;
    } else {
        subscriber
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| format!("Failed to set global subscriber: {}", e))?;
    }

    Ok(())
}

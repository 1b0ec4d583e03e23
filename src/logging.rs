use crate::config::LoggingConfig;
use crate::error::NodeError;
use std::fs;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Keeps the file writer flushing for the life of the process
static FILE_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the global subscriber: console output plus, when a directory is
/// configured, daily-rotated log files. `RUST_LOG` overrides the configured
/// level. `log` records from dependencies are bridged in as well. Only the
/// first call has an effect.
pub fn init(config: &LoggingConfig) -> Result<(), NodeError> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let console = fmt::Layer::new()
        .with_target(true)
        .with_thread_ids(true)
        .with_filter(filter(&config.level));

    let (file, guard) = match &config.directory {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("nodeward")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| NodeError::config(format!("Failed to create log file appender: {}", e)))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = if config.json_file {
                fmt::Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_filter(filter(&config.level))
                    .boxed()
            } else {
                fmt::Layer::new()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter(&config.level))
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| NodeError::config(format!("Failed to set tracing subscriber: {}", e)))?;

    let _ = FILE_GUARD.set(guard);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_is_idempotent_and_creates_log_dir() {
        let dir = tempdir().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            directory: Some(dir.path().join("logs")),
            json_file: true,
        };

        init(&config).unwrap();
        tracing::info!("logging initialized for test");
        init(&config).unwrap();

        assert!(dir.path().join("logs").is_dir());
    }
}

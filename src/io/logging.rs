use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::model::LoggingConfig;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log lines may go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// stderr, plus a file when configured
    Console,
    /// File only: the terminal belongs to the TUI
    FileOnly,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("could not create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn log_directory(config: &LoggingConfig) -> PathBuf {
    match config
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(dir) => PathBuf::from(dir),
        None => std::env::temp_dir().join("cascade"),
    }
}

fn filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => Ok(EnvFilter::from_default_env()),
        _ => EnvFilter::try_new(&config.level).map_err(|e| LoggingError::Filter(e.to_string())),
    }
}

/// Install the global subscriber. Returns the log file path when one is used.
pub fn init_tracing(
    config: &LoggingConfig,
    target: LogTarget,
) -> Result<Option<PathBuf>, LoggingError> {
    let filter = filter(config)?;

    let mut log_file = None;
    let mut writer = None;
    if config.file || target == LogTarget::FileOnly {
        let dir = log_directory(config);
        std::fs::create_dir_all(&dir).map_err(|e| LoggingError::Directory {
            path: dir.clone(),
            source: e,
        })?;
        let file_name = format!("cascade.{}.log", std::process::id());
        log_file = Some(dir.join(&file_name));
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        writer = Some(non_blocking);
    }

    let console_layer = (target == LogTarget::Console)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let file_layer = writer.map(|w| tracing_subscriber::fmt::layer().with_writer(w).with_ansi(false));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_directory_falls_back_to_temp() {
        let config = LoggingConfig {
            directory: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(log_directory(&config), std::env::temp_dir().join("cascade"));
    }

    #[test]
    fn configured_directory_is_used() {
        let config = LoggingConfig {
            directory: Some("/var/log/cascade".into()),
            ..Default::default()
        };
        assert_eq!(log_directory(&config), PathBuf::from("/var/log/cascade"));
    }
}

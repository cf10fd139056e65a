//! Structured logging infrastructure.
//!
//! The pipeline emits `tracing` events carrying `id_conversazione` and
//! `id_messaggio` fields on every run; [`init`] installs a subscriber that
//! renders them as JSON lines (the default), compact single lines, or a
//! pretty multi-line format, to stdout or a file. Log sinks downstream of
//! stdout/file are out of scope.

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

use crate::config::{LogFormat, LogLevel, LoggingConfig};

/// Error type for logging operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a log level name
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// Result type for logging operations.
pub type Result<T> = std::result::Result<T, LogError>;

/// Initialize the global subscriber from the given configuration.
///
/// Calling this twice is harmless: a subscriber that is already installed is
/// left in place. When logging to a file, the returned [`WorkerGuard`] must
/// be kept alive for buffered lines to flush.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = match config.level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    };

    // With no file and stdout disabled there is nowhere to write; leave the
    // default no-op subscriber in place.
    if config.file.is_none() && !config.stdout {
        return Ok(None);
    }

    let (writer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = non_blocking_file(path)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    install_subscriber(level, config.format, writer);
    Ok(guard)
}

fn install_subscriber(level: Level, format: LogFormat, file_writer: Option<NonBlocking>) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_level(true)
        .with_target(true);

    // The fmt builder changes type with every format/writer combination, so
    // each arm finishes the build on its own. `try_init` only fails when a
    // global subscriber is already installed; that one stays.
    let _ = match (format, file_writer) {
        (LogFormat::Json, Some(writer)) => builder.json().with_writer(writer).try_init(),
        (LogFormat::Json, None) => builder.json().try_init(),
        (LogFormat::Compact, Some(writer)) => builder.compact().with_writer(writer).try_init(),
        (LogFormat::Compact, None) => builder.compact().try_init(),
        (LogFormat::Pretty, Some(writer)) => builder.pretty().with_writer(writer).try_init(),
        (LogFormat::Pretty, None) => builder.pretty().try_init(),
    };
}

/// Create a non-blocking appender for the given file path, creating parent
/// directories as needed.
fn non_blocking_file(path: impl AsRef<Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| Path::new(".")),
        path.file_name().unwrap_or_default(),
    );

    Ok(tracing_appender::non_blocking(appender))
}

/// Parse a log level name into a [`LogLevel`].
pub fn parse_log_level(level: &str) -> Result<LogLevel> {
    level
        .parse()
        .map_err(|_| LogError::InvalidLogLevel(level.to_string()))
}

//! Logging infrastructure for whiffy.
//!
//! Provides structured diagnostics on stderr, keeping stdout free for the
//! feature collection:
//! - Compact format on stderr
//! - Optional log file (truncated at session start)
//! - Configurable via RUST_LOG environment variable

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging system.
///
/// # Arguments
///
/// * `default_level` - Filter used when RUST_LOG is not set (e.g. "info")
/// * `log_file` - Optional file receiving a copy of every event
///
/// # Errors
///
/// Returns error if the log file's directory cannot be created or the file
/// cannot be cleared.
pub fn init_logging(
    default_level: &str,
    log_file: Option<&Path>,
) -> Result<LoggingGuard, io::Error> {
    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "log file path has no file name")
            })?;

            fs::create_dir_all(dir)?;
            fs::write(path, "")?;

            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    // Create env filter (defaults to the given level if RUST_LOG not set)
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Only one test may install the global subscriber per process
    #[test]
    fn test_creates_directory_and_clears_file() {
        let temp = TempDir::new().unwrap();
        let log_path = temp.path().join("logs").join("whiffy.log");
        fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        fs::write(&log_path, "previous session").unwrap();

        let guard = init_logging(DEFAULT_LOG_LEVEL, Some(&log_path));

        // Another test binary may already own the global subscriber
        if guard.is_ok() {
            tracing::info!("first message");
            drop(guard);
            let content = fs::read_to_string(&log_path).unwrap();
            assert!(!content.contains("previous session"));
        }
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        let result = init_logging(DEFAULT_LOG_LEVEL, Some(Path::new("/")));
        assert!(result.is_err());
    }
}

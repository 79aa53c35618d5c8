//! Logging setup: stderr, plus a log file when a log directory is available.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log file name inside the log directory.
const LOG_FILE_NAME: &str = "zksend.log";

/// Initialise the global subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). The file layer writes to
/// `ZKSEND_LOG_DIR`, or the platform cache directory when unset; the returned
/// guard must be held until exit so buffered lines are flushed.
pub fn setup_logging() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_directory() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialise logging")?;

    Ok(guard)
}

/// `ZKSEND_LOG_DIR`, else `<cache dir>/zksend/logs`.
fn log_directory() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("ZKSEND_LOG_DIR") {
        return Some(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("com", "zksend", "zksend")
        .map(|dirs| dirs.cache_dir().join("logs"))
}

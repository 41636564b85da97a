//! Tracing setup.
//!
//! The terminal belongs to the UI, so log output goes to a file under the state
//! directory through a non-blocking writer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

pub const LOG_FILE_NAME: &str = "roundcount.log";

/// Filter from `RUST_LOG` when set, otherwise from `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber writing to `<log_dir>/roundcount.log`.
///
/// The returned guard must be held until exit so buffered lines are flushed.
pub fn init_tracing(log_dir: &Path, default_level: &str) -> Result<WorkerGuard> {
    let log_path = log_path(log_dir);
    fs::create_dir_all(log_dir)?;
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}

pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_is_inside_dir() {
        let path = log_path(Path::new("/tmp/rc"));
        assert_eq!(path, PathBuf::from("/tmp/rc/roundcount.log"));
    }

    #[test]
    fn env_filter_accepts_level_names() {
        let filter = env_filter("debug");
        assert!(!filter.to_string().is_empty());
    }
}

//! Logging setup: console output plus a daily-rolling log file, with old
//! files pruned on startup.

use crate::{config::LoggingConfig, paths::AppDirs};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "regwatch.log";

/// Keeps the non-blocking appender worker alive; dropping it flushes and
/// stops file logging.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber. File output always rolls daily under the
/// app's log directory; console output is governed by `config.stdout`. A
/// `RUST_LOG` environment variable overrides the configured level.
pub fn init_logging(config: &LoggingConfig, dirs: &AppDirs) -> Result<LoggingGuard, LoggingError> {
    let log_dir = dirs.log_dir();
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::Io {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let file_stem = config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE);
    prune_log_files(log_dir, file_stem, config.max_log_files.max(1))?;

    let appender = tracing_appender::rolling::daily(log_dir, file_stem);
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
    let writer = if config.stdout {
        BoxMakeWriter::new(std::io::stdout.and(file_writer))
    } else {
        BoxMakeWriter::new(file_writer)
    };

    // Configured levels are a closed enum, so the fallback directive is
    // always parseable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter_directive()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.stdout)
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::Install)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Delete the oldest files sharing `file_stem` so at most `keep` remain.
fn prune_log_files(dir: &Path, file_stem: &str, keep: usize) -> Result<(), LoggingError> {
    let entries = fs::read_dir(dir).map_err(|source| LoggingError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut logs: Vec<(SystemTime, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(file_stem))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.path()))
        })
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }

    let excess = logs.len() - keep;
    logs.sort_unstable_by_key(|(modified, _)| *modified);
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::Io { path, source })?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log file housekeeping failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Install(Box<dyn std::error::Error + Send + Sync>),
}

//! # Logging
//!
//! Installs the global `tracing` subscriber used by the binaries:
//! - `RUST_LOG` controls verbosity, falling back to the configured level;
//! - human-readable, coloured console output with targets;
//! - JSON lines in a daily-rolling file under the log directory.
//!
//! The file writer is non-blocking. Keep the returned [`WorkerGuard`] alive
//! until exit or buffered lines are lost.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sets up console and file logging for `app_name`.
///
/// Rolled files are named `<app_name>.<YYYY-MM-DD>`; only the newest
/// `retention` of them survive start-up.
pub fn setup_logging(
    log_dir: &Path,
    log_level: &str,
    app_name: &str,
    retention: usize,
) -> io::Result<WorkerGuard> {
    fs::create_dir_all(log_dir)?;

    let pruned = prune_rolled_files(log_dir, app_name, retention)?;

    let file_appender = rolling::daily(log_dir, app_name);
    let (file_writer, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(
        level = log_level,
        dir = %log_dir.display(),
        pruned = pruned.len(),
        "logging initialized"
    );
    Ok(guard)
}

/// Deletes the oldest `<app_name>.*` files beyond `retention` and returns
/// what was removed. The date suffix sorts chronologically by name.
pub fn prune_rolled_files(log_dir: &Path, app_name: &str, retention: usize) -> io::Result<Vec<PathBuf>> {
    let prefix = format!("{app_name}.");
    let mut rolled: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();

    // Newest first.
    rolled.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = Vec::new();
    for path in rolled.into_iter().skip(retention) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => eprintln!("Failed to delete old log file {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

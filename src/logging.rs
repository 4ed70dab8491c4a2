//! Log-file helpers and subscriber setup.
//!
//! Session output goes to stdout, so tracing always writes to a file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use sling_config::LogConfig;

/// Maximum size of a single log file before rotation (10 MB).
pub(crate) const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated log files to retain.
pub(crate) const DEFAULT_MAX_LOG_FILES: u32 = 5;

/// Platform default: `<data-local-dir>/sling/sling.log`, or the temp
/// directory when there is no data directory.
pub(crate) fn default_log_file_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sling")
        .join("sling.log")
}

/// Create the parent directory of a log file if it is missing.
pub(crate) fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    match log_path.parent() {
        Some(parent) if !parent.exists() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Rotate `sling.log -> sling.log.1 -> ... -> sling.log.<max_files>` once
/// the current file reaches `max_size` bytes. The oldest file is dropped.
pub(crate) fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    let Ok(metadata) = fs::metadata(log_path) else {
        return Ok(());
    };
    if metadata.len() < max_size {
        return Ok(());
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for i in (1..max_files).rev() {
        let from = rotated_path(log_path, i);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, i + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))
}

/// Map a level name (any case) to a filter directive; unknown names
/// become `info`.
pub(crate) fn log_level_to_filter(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level. Returns the file being written.
pub(crate) fn init(config: &LogConfig) -> Result<PathBuf> {
    let path = config.file.clone().unwrap_or_else(default_log_file_path);
    ensure_log_dir(&path).with_context(|| format!("cannot create {}", path.display()))?;
    if let Err(e) = rotate_log_files(&path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES) {
        eprintln!("sling: log rotation failed: {e}");
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level_to_filter(config.level.as_str())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(path)
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    base.with_file_name(format!("{name}.{index}"))
}

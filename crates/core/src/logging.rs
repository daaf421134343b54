//! Logging initialization for the daemon.
//!
//! Lines go to the configured log file (appended, never rotated) or to
//! stderr when no file is configured. `RUST_LOG` overrides the configured
//! level when set.

use crate::{
    config::LoggingConfig,
    error::{CoreError, Result},
};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

const DEFAULT_LOG_FILE_NAME: &str = "metricsd.log";

/// Build the effective filter, honoring RUST_LOG if set
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let overrides = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(overrides.as_deref(), config)
}

/// Valid `overrides` directives win over the configured level
fn resolve_filter(overrides: Option<&str>, config: &LoggingConfig) -> Result<EnvFilter> {
    if let Some(directives) = overrides.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return Ok(filter);
        }
    }

    let level = config.level_filter()?;
    EnvFilter::try_new(level).map_err(|e| CoreError::logging(e.to_string()))
}

/// Split a log path into the directory and file name the appender expects
fn split_log_path(path: &Path) -> (PathBuf, &OsStr) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE_NAME));
    (dir.to_path_buf(), file_name)
}

fn build_writer(config: &LoggingConfig) -> Result<(BoxMakeWriter, bool)> {
    match config.log_file.as_deref() {
        Some(path) => {
            let (dir, file_name) = split_log_path(path);
            // Synchronous appender, writes happen on the loop thread
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name.to_string_lossy().into_owned())
                .build(&dir)
                .map_err(|e| {
                    CoreError::logging(format!(
                        "Failed to open log file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            Ok((BoxMakeWriter::new(appender), true))
        }
        None => Ok((BoxMakeWriter::new(std::io::stderr), false)),
    }
}

/// Install the global subscriber. Call once, before the first tick.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let (writer, to_file) = build_writer(config)?;

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!to_file)
        .try_init()
        .map_err(|e| CoreError::logging(e.to_string()))
}

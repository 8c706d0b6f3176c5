//! Tracing setup: human-readable stderr plus daily-rotated JSON files

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogLevel;

/// Rotated log files kept on disk, one per day
const MAX_LOG_FILES: usize = 14;

/// Install the global subscriber
///
/// `RUST_LOG` overrides `level` when set. Keep the returned guard alive for
/// the whole process or buffered file lines are lost on exit.
pub fn init(level: LogLevel, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("log")
        .filename_suffix("json")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .context("cannot open log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().json().with_writer(file_writer))
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(guard)
}

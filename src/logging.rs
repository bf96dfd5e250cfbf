//! Logging configuration using tracing
//!
//! The TUI owns the terminal, so logs go to a rolling file under the user
//! data dir. `VIDGRAB_LOG` controls the filter.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::Result;

/// Initialize the logging subsystem
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "vidgrab.log");

    let env_filter =
        EnvFilter::try_from_env("VIDGRAB_LOG").unwrap_or_else(|_| EnvFilter::new("vidgrab=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vidgrab starting");
    tracing::info!(log_dir = %log_dir.display(), "log directory");

    Ok(())
}

/// Where log files are written
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidgrab")
        .join("logs")
}

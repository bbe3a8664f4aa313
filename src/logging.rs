//! Tracing setup for the command-line binary.
//!
//! Two outputs share one filter: a compact console layer and a plain-text
//! layer appended to the configured log file through a background writer.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "answer_dl=info";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held until
/// the program exits. Fails if the log file's directory cannot be created or
/// a subscriber is already installed.
pub fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let file_name = log_file
        .file_name()
        .ok_or_else(|| Error::config("log_file", format!("not a file path: {}", log_file.display())))?;

    // `never` opens the file in append mode and does not rotate
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(filter());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| Error::config("log_file", format!("cannot install logger: {}", e)))?;

    Ok(guard)
}

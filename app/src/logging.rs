use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

const DEFAULT_CONSOLE_FILTER: &str = "warn,photogeo=info,thumbnail_cache=info,photo_metadata=info";
const LOG_FILE_PREFIX: &str = "app.log";

pub fn default_log_dir() -> Result<PathBuf> {
    Ok(crate::config::AppSettings::data_dir()?.join("Logs"))
}

/// Install the global subscriber: `RUST_LOG`-filtered console output on
/// stderr plus a daily rolling debug log under `log_dir`.
///
/// Keep the returned guard alive for as long as logs should reach the file.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Logging to {}", log_dir.display());
    Ok(guard)
}

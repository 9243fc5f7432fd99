use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::resolve_repo_path;
use crate::types::{EngineConfig, DEFAULT_LOG_FILTER, LOG_FILE_NAME};

/// Installs the global subscriber: daily-rolling file under the configured
/// log dir, filter from `RUST_LOG` or the config. The returned guard must be
/// held for as long as logs should be flushed. Later calls leave the first
/// subscriber in place.
pub fn init_tracing(config: &EngineConfig) -> Result<WorkerGuard, String> {
    let logs_dir = resolve_repo_path(&config.log_dir);
    fs::create_dir_all(&logs_dir)
        .map_err(|e| format!("create log dir {}: {e}", logs_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = if config.log_filter.trim().is_empty() {
        DEFAULT_LOG_FILTER
    } else {
        config.log_filter.trim()
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(guard)
}

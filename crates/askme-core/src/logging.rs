//! Tracing setup.
//!
//! Logs go to `${ASKME_HOME}/logs/<file>` through a non-blocking appender; the
//! terminal belongs to the TUI. `ASKME_LOG` takes an `EnvFilter` directive and
//! overrides `[logging] level`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "ASKME_LOG";

/// Builds the filter: `ASKME_LOG` if set and valid, else the configured level.
fn build_filter(config_level: &str) -> EnvFilter {
    if let Ok(directive) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(directive.trim())
    {
        return filter;
    }
    EnvFilter::try_new(config_level.trim()).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber writing to `log_dir`.
///
/// The returned guard flushes pending lines on drop and must be held for the
/// life of the process. Calling this twice keeps the first subscriber.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(log_dir, &config.file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn configured_level_is_used() {
        let filter = build_filter(" warn ");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let config = LoggingConfig::default();

        let guard = init(&config, &logs).unwrap();
        assert!(logs.is_dir());
        drop(guard);
    }
}

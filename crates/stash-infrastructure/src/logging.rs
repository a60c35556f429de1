//! Structured logging with tracing
//!
//! One subscriber per process: stdout in plain or JSON format, plus an
//! optional daily rolling file. `STASH_LOG` overrides the configured level
//! with a full `EnvFilter` directive (e.g. `stash_providers=debug,info`).

use crate::config::LoggingConfig;
use crate::constants::{DEFAULT_LOG_FILE_STEM, LOG_FILTER_ENV};
use stash_domain::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// Fails with a configuration error on an unknown level, and with an
/// infrastructure error when a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let file_appender = config.file_output.as_ref().map(|path| {
        tracing_appender::rolling::daily(
            path.parent().unwrap_or_else(|| Path::new(".")),
            path.file_name()
                .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE_STEM)),
        )
    });

    // The layer types differ per format, hence the separate branches.
    let installed = if config.json_format {
        let stdout = fmt::layer().json().with_target(true).with_thread_ids(true);
        let registry = Registry::default().with(filter).with(stdout);
        match file_appender {
            Some(appender) => registry
                .with(fmt::layer().json().with_writer(appender).with_ansi(false))
                .try_init(),
            None => registry.try_init(),
        }
    } else {
        let stdout = fmt::layer().with_target(true);
        let registry = Registry::default().with(filter).with(stdout);
        match file_appender {
            Some(appender) => registry
                .with(fmt::layer().with_writer(appender).with_ansi(false))
                .try_init(),
            None => registry.try_init(),
        }
    };
    installed.map_err(|e| Error::infrastructure_with_source("Logging is already initialized", e))?;

    info!(level = %level, json = config.json_format, "logging initialized");
    Ok(())
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Error::configuration(format!(
            "Invalid log level: {level}. Use trace, debug, info, warn, or error"
        ))),
    }
}

/// Log configuration loading status
pub fn log_config_loaded(config_path: &Path, found: bool) {
    if found {
        info!(path = %config_path.display(), "configuration loaded");
    } else {
        warn!(path = %config_path.display(), "configuration file not found, using defaults");
    }
}

/// Log health check result
pub fn log_health_check(component: &str, healthy: bool, details: Option<&str>) {
    if healthy {
        debug!(component = component, "health check passed");
    } else {
        error!(
            component = component,
            details = details.unwrap_or("unknown failure"),
            "health check failed"
        );
    }
}

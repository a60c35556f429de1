//! Configuration loader
//!
//! Loads [`AppConfig`] from defaults, a TOML file and environment
//! variables using Figment, then validates it. Nested keys in the
//! environment use a double underscore:
//!
//! ```text
//! STASH_CACHE__BACKEND=remote
//! STASH_CACHE__REMOTE__HOST=cache.internal
//! STASH_MONITOR__THRESHOLDS__HIT_RATE_MIN=0.5
//! ```

use crate::config::{
    AppConfig, CacheConfig, GuardConfig, LoggingConfig, MonitoringConfig, RefreshConfig,
};
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use stash_domain::error::{Error, Result};
use stash_domain::value_objects::BackendKind;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    #[must_use]
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Later sources override earlier ones:
    /// 1. `AppConfig::default()`
    /// 2. The TOML file (explicit path, or the first default location found)
    /// 3. Environment variables with the prefix (e.g. `STASH_CACHE__PREFIX`)
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(config_path) = &self.config_path {
            let found = config_path.exists();
            if found {
                figment = figment.merge(Toml::file(config_path));
            }
            log_config_loaded(config_path, found);
        } else if let Some(default_path) = Self::find_default_config_path() {
            figment = figment.merge(Toml::file(&default_path));
            log_config_loaded(&default_path, true);
        }

        figment = figment.merge(
            Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_SEPARATOR),
        );

        let app_config: AppConfig = figment
            .extract()
            .map_err(|e| Error::configuration(format!("Failed to extract configuration: {e}")))?;

        validate_app_config(&app_config)?;
        Ok(app_config)
    }

    /// Write `config` as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")?;
        std::fs::write(path.as_ref(), toml_string).io_context("Failed to write config file")?;
        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// First existing file among the default locations
    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let candidates = [
            Some(current_dir.join(DEFAULT_CONFIG_FILENAME)),
            Some(
                current_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME),
            ),
            dirs::config_dir().map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
        ];

        candidates.into_iter().flatten().find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate application configuration
///
/// Every problem surfaces at startup as a configuration error.
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    parse_log_level(&config.logging.level)?;
    validate_cache_config(&config.cache)?;
    validate_guard_config(&config.guard)?;
    validate_refresh_config(&config.refresh)?;
    validate_monitor_config(&config.monitor)?;
    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<()> {
    let kinds = config.backend_kinds()?;

    if config.default_ttl_secs == Some(0) {
        return Err(Error::configuration(
            "Cache default TTL cannot be 0 (leave it unset for no expiry)",
        ));
    }
    if kinds.contains(&BackendKind::Memory) && config.memory.max_entries == 0 {
        return Err(Error::configuration(
            "Memory cache capacity (cache.memory.max_entries) cannot be 0",
        ));
    }
    if kinds.contains(&BackendKind::File)
        && config
            .file
            .directory
            .as_ref()
            .is_none_or(|dir| dir.as_os_str().is_empty())
    {
        return Err(Error::configuration(
            "The file backend requires a cache directory (cache.file.directory)",
        ));
    }
    if kinds.contains(&BackendKind::Remote) {
        let remote = &config.remote;
        if remote.host.trim().is_empty() || remote.port == 0 {
            return Err(Error::configuration(
                "Remote cache host and port must be set (cache.remote.host, cache.remote.port)",
            ));
        }
        if remote.max_pool_size == 0 {
            return Err(Error::configuration(
                "Remote cache pool size (cache.remote.max_pool_size) cannot be 0",
            ));
        }
        if remote.connect_timeout_secs == 0 || remote.socket_timeout_secs == 0 {
            return Err(Error::configuration(
                "Remote cache timeouts must be greater than 0",
            ));
        }
    }
    Ok(())
}

fn validate_guard_config(config: &GuardConfig) -> Result<()> {
    if config.null_ttl_secs == 0 {
        return Err(Error::configuration(
            "Null value TTL (guard.null_ttl_secs) cannot be 0",
        ));
    }
    Ok(())
}

fn validate_refresh_config(config: &RefreshConfig) -> Result<()> {
    if config.shutdown_timeout_secs == 0 {
        return Err(Error::configuration(
            "Refresh shutdown timeout (refresh.shutdown_timeout_secs) cannot be 0",
        ));
    }
    Ok(())
}

fn validate_monitor_config(config: &MonitoringConfig) -> Result<()> {
    if config.interval_secs == 0 {
        return Err(Error::configuration(
            "Monitor interval (monitor.interval_secs) cannot be 0",
        ));
    }
    if config.history_limit == 0 {
        return Err(Error::configuration(
            "Monitor history limit (monitor.history_limit) cannot be 0",
        ));
    }
    let thresholds = &config.thresholds;
    if !(0.0..=1.0).contains(&thresholds.hit_rate_min)
        || !(0.0..=1.0).contains(&thresholds.error_rate_max)
    {
        return Err(Error::configuration(
            "Monitor hit/error rate thresholds must be between 0 and 1",
        ));
    }
    Ok(())
}

/// Programmatic configuration, starting from the defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    #[must_use]
    pub fn with_guard(mut self, guard: GuardConfig) -> Self {
        self.config.guard = guard;
        self
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshConfig) -> Self {
        self.config.refresh = refresh;
        self
    }

    #[must_use]
    pub fn with_monitor(mut self, monitor: MonitoringConfig) -> Self {
        self.config.monitor = monitor;
        self
    }

    /// The configuration as built, unvalidated
    pub fn build(self) -> AppConfig {
        self.config
    }

    /// The configuration, rejected if invalid
    pub fn try_build(self) -> Result<AppConfig> {
        validate_app_config(&self.config)?;
        Ok(self.config)
    }
}

//! Root application configuration

use super::{CacheConfig, GuardConfig, LoggingConfig, MonitoringConfig, RefreshConfig};
use serde::{Deserialize, Serialize};

/// Root configuration, one field per `stash.toml` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `[logging]`
    pub logging: LoggingConfig,

    /// `[cache]`: backends, prefix, default TTL
    pub cache: CacheConfig,

    /// `[guard]`: penetration guard
    pub guard: GuardConfig,

    /// `[refresh]`: background refresh workers
    pub refresh: RefreshConfig,

    /// `[monitor]`: metrics collection and alert thresholds
    pub monitor: MonitoringConfig,
}

//! Guard, refresh and monitor configuration types

use serde::{Deserialize, Serialize};
use stash_application::{AlertThresholds, MonitorConfig};
use stash_domain::constants::{
    ALERT_RETENTION_SECS, DEFAULT_NULL_VALUE_TTL_SECS, METRICS_HISTORY_LIMIT,
    MONITOR_INTERVAL_SECS, REFRESH_ERROR_COOLDOWN_SECS, WORKER_SHUTDOWN_TIMEOUT_SECS,
};
use std::time::Duration;

/// Penetration guard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// How long a "known absent" marker is kept
    pub null_ttl_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            null_ttl_secs: DEFAULT_NULL_VALUE_TTL_SECS,
        }
    }
}

impl GuardConfig {
    pub fn null_ttl(&self) -> Duration {
        Duration::from_secs(self.null_ttl_secs)
    }
}

/// Background refresh configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Pause after a failed refresh before the next interval starts
    pub error_cooldown_secs: u64,

    /// Per-worker wait when shutting down
    pub shutdown_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            error_cooldown_secs: REFRESH_ERROR_COOLDOWN_SECS,
            shutdown_timeout_secs: WORKER_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl RefreshConfig {
    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Run the periodic monitor loop in `serve`
    pub enabled: bool,

    /// Seconds between monitoring cycles
    pub interval_secs: u64,

    /// Snapshots kept in memory
    pub history_limit: usize,

    /// Seconds an alert stays in the report
    pub alert_retention_secs: u64,

    /// Limits turned into the default alert rules
    pub thresholds: AlertThresholds,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: MONITOR_INTERVAL_SECS,
            history_limit: METRICS_HISTORY_LIMIT,
            alert_retention_secs: ALERT_RETENTION_SECS,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl MonitoringConfig {
    /// Settings for [`stash_application::CacheMonitor`]
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.interval_secs),
            history_limit: self.history_limit,
            alert_retention: Duration::from_secs(self.alert_retention_secs),
            thresholds: self.thresholds.clone(),
        }
    }
}

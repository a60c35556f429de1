//! Domain layer constants
//!
//! Defaults that are part of the caching semantics themselves. Deployment
//! defaults (hosts, pool sizes, file names) live in
//! `stash_infrastructure::constants`.

// ============================================================================
// KEY CONSTANTS
// ============================================================================

/// Separator placed between the manager prefix and the caller's key
pub const CACHE_KEY_SEPARATOR: &str = ":";

/// Default key prefix applied by the cache manager
pub const DEFAULT_CACHE_PREFIX: &str = "stash";

// ============================================================================
// PENETRATION GUARD CONSTANTS
// ============================================================================

/// Sentinel payload stored for keys whose fetch produced no value
pub const NULL_VALUE_MARKER: &str = "__stash_null_marker__";

/// How long a null marker shields the backing store (5 minutes)
pub const DEFAULT_NULL_VALUE_TTL_SECS: u64 = 300;

// ============================================================================
// RETRY CONSTANTS
// ============================================================================

/// Total attempts (first try included) for transient remote failures
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay; doubled after every failed attempt
pub const RETRY_BASE_DELAY_MS: u64 = 100;

// ============================================================================
// REFRESH CONSTANTS
// ============================================================================

/// Cooldown applied after a refresh function fails
pub const REFRESH_ERROR_COOLDOWN_SECS: u64 = 60;

// ============================================================================
// MONITORING CONSTANTS
// ============================================================================

/// Default metrics collection interval
pub const MONITOR_INTERVAL_SECS: u64 = 60;

/// Number of snapshots retained in the metrics history
pub const METRICS_HISTORY_LIMIT: usize = 1000;

/// Alerts older than this are pruned (1 hour)
pub const ALERT_RETENTION_SECS: u64 = 3600;

/// Default minimum acceptable hit rate
pub const DEFAULT_HIT_RATE_MIN: f64 = 0.8;

/// Default maximum acceptable error rate
pub const DEFAULT_ERROR_RATE_MAX: f64 = 0.05;

/// Default maximum acceptable mean response time in milliseconds
pub const DEFAULT_RESPONSE_TIME_MAX_MS: f64 = 100.0;

/// Default maximum process memory usage percentage
pub const DEFAULT_MEMORY_USAGE_MAX: f64 = 90.0;

// ============================================================================
// LIFECYCLE CONSTANTS
// ============================================================================

/// Bounded wait for a background worker to stop
pub const WORKER_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Key used by the health checker's round trip
pub const HEALTH_CHECK_KEY: &str = "__stash_health_check__";

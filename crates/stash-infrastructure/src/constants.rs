//! Infrastructure layer constants
//!
//! Cache behaviour defaults live in `stash_domain::constants`; this module
//! only holds what the configuration, logging and health layers need.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "stash.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "stash";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "STASH";

/// Separator for nested keys in environment variables (`STASH_CACHE__PREFIX`)
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log filter
pub const LOG_FILTER_ENV: &str = "STASH_LOG";

/// File stem used when the log file path has none
pub const DEFAULT_LOG_FILE_STEM: &str = "stash";

// ============================================================================
// CACHE CONSTANTS
// ============================================================================

/// Backend used when none is configured
pub const DEFAULT_CACHE_BACKEND: &str = "memory";

/// Default Redis host
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";

/// Default Redis port
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Redis connection pool size
pub const REDIS_POOL_SIZE: usize = 10;

/// Redis connect timeout in seconds
pub const REDIS_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Redis socket (command) timeout in seconds
pub const REDIS_SOCKET_TIMEOUT_SECS: u64 = 5;

/// Seconds between Redis connection probes
pub const REDIS_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

// ============================================================================
// HEALTH CHECK CONSTANTS
// ============================================================================

/// TTL of the probe value written by the cache health check
pub const HEALTH_PROBE_TTL_SECS: u64 = 10;

/// System memory usage above which the host is reported degraded
pub const HEALTH_MEMORY_THRESHOLD_PERCENT: f64 = 90.0;

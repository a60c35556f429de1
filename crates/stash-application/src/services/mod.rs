//! Cache services
//!
//! Data flows callers → [`CacheManager`] → (optionally [`StrategyManager`])
//! → backend. The guard wraps manager calls for hot keys; the refresh
//! manager and the monitor run as background tasks on top of both.

pub mod guard;
pub mod manager;
pub mod monitor;
pub mod refresh;
pub mod strategy;

pub use guard::PenetrationGuard;
pub use manager::{CacheCounters, CacheHandle, CacheManager};
pub use monitor::{AlertCallback, AlertThresholds, CacheMonitor, MonitorConfig};
pub use refresh::RefreshManager;
pub use strategy::StrategyManager;

//! Domain Port Interfaces
//!
//! Boundary contracts implemented by the outer layers:
//! - **providers/** - cache backends (memory, file, remote, null)
//! - **infrastructure/** - system probes consumed by the monitor

/// Infrastructure service ports
pub mod infrastructure;
/// Cache backend ports
pub mod providers;

pub use infrastructure::{SystemMetrics, SystemMetricsCollector};
pub use providers::{BackendStats, CacheBackend};

//! System Metrics Collector Port
//!
//! Source of the memory figures the monitor folds into each snapshot.

use crate::error::Result;
use async_trait::async_trait;

/// System metrics data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMetrics {
    /// Process resident memory as a percentage of total system memory
    pub memory_percent: f64,
    /// Process resident memory in bytes
    pub process_memory_bytes: u64,
    /// Process CPU usage percentage
    pub cpu_percent: f64,
}

/// System metrics collector interface
#[async_trait]
pub trait SystemMetricsCollector: Send + Sync {
    /// Collect current process metrics
    async fn collect(&self) -> Result<SystemMetrics>;
}

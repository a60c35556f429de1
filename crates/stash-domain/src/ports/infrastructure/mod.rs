//! Infrastructure ports

pub mod metrics;

pub use metrics::{SystemMetrics, SystemMetricsCollector};

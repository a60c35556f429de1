//! Value objects
//!
//! Immutable descriptions passed between layers: which backend to build and
//! how, and what the monitor observed.

pub mod backend;
pub mod metrics;

pub use backend::{
    BackendConfig, BackendKind, FileBackendConfig, MemoryBackendConfig, RemoteBackendConfig,
};
pub use metrics::{
    Alert, AlertLevel, AlertSummary, Comparison, Metric, MetricsReport, MetricsSnapshot,
    ThresholdRule,
};

//! # Domain Layer
//!
//! Core types and contracts for the Stash caching subsystem. Nothing in this
//! crate performs I/O; backends, services and wiring live in the outer layers.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`entities`] | Strategy-tracked cache entries |
//! | [`value_objects`] | Backend selection/config, metrics snapshots, alerts, threshold rules |
//! | [`ports`] | Traits implemented by backends and system probes |
//! | [`error`] | Shared error type and `Result` alias |
//! | [`constants`] | Domain-level defaults |

pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use entities::CacheEntry;
pub use error::{Error, Result};
pub use ports::providers::cache::{BackendStats, CacheBackend};
pub use value_objects::{
    Alert, AlertLevel, BackendConfig, BackendKind, Comparison, FileBackendConfig,
    MemoryBackendConfig, Metric, MetricsReport, MetricsSnapshot, RemoteBackendConfig,
    ThresholdRule,
};

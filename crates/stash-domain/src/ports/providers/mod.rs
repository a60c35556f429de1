//! Provider ports

pub mod cache;

pub use cache::{BackendStats, CacheBackend};

//! Configuration types module

pub mod app;
pub mod cache;
pub mod logging;
pub mod services;

// Re-export main types
pub use app::AppConfig;
pub use cache::{CacheConfig, FileCacheConfig, MemoryCacheConfig, RemoteCacheConfig};
pub use logging::LoggingConfig;
pub use services::{GuardConfig, MonitoringConfig, RefreshConfig};

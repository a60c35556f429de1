//! Cache Backend Implementations
//!
//! ## Available Backends
//!
//! | Backend | Type | Description |
//! |---------|------|-------------|
//! | [`MemoryCacheBackend`] | Local | Moka map, lazy expiry on access |
//! | [`FileCacheBackend`] | Local | Hashed envelope files, atomic writes |
//! | [`RedisCacheBackend`] | Distributed | Redis protocol, pooled and retried |
//! | [`NullCacheBackend`] | Testing | Stores nothing |

pub mod file;
pub mod memory;
pub mod null;
pub mod pattern;
#[cfg(feature = "cache-redis")]
pub mod redis;
pub mod stats;

pub use file::FileCacheBackend;
pub use memory::MemoryCacheBackend;
pub use null::NullCacheBackend;
pub use pattern::KeyPattern;
#[cfg(feature = "cache-redis")]
pub use redis::{RedisCacheBackend, RetryPolicy};
pub use stats::StatsRecorder;

//! # Stash - Cache Backend Implementations
//!
//! Every backend implements [`CacheBackend`] from `stash-domain`. Backends are
//! chosen by [`BackendKind`](stash_domain::BackendKind) once at startup
//! through the [`registry`].
//!
//! | Kind | Type | Description |
//! |------|------|-------------|
//! | `memory` | [`MemoryCacheBackend`](cache::MemoryCacheBackend) | Moka map with per-entry expiry |
//! | `file` | [`FileCacheBackend`](cache::FileCacheBackend) | One JSON envelope per key on disk |
//! | `remote` | `RedisCacheBackend` | Pooled Redis connections with retry and health probing |
//! | `null` | [`NullCacheBackend`](cache::NullCacheBackend) | Stores nothing |
//!
//! ## Feature Flags
//!
//! The remote backend is behind `cache-redis` (enabled by default):
//!
//! ```toml
//! [dependencies]
//! stash-providers = { version = "0.1", default-features = false }
//! ```

pub use stash_domain::error::{Error, Result};
pub use stash_domain::ports::providers::{BackendStats, CacheBackend};

/// Provider-specific constants
pub mod constants;

/// Cache backend implementations
pub mod cache;

/// Backend kind to constructor registry
pub mod registry;

pub use registry::{BackendRegistry, list_backends, resolve_backend};

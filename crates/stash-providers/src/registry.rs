//! Backend Registry
//!
//! Maps each [`BackendKind`] to the function that builds it. The map is
//! consulted once at startup; unknown names fail with a configuration
//! error listing what is available.
//!
//! ## Example
//!
//! ```ignore
//! use stash_domain::BackendConfig;
//! use stash_providers::resolve_backend;
//!
//! let backend = resolve_backend("memory", &BackendConfig::default())?;
//! ```

use crate::cache::{FileCacheBackend, MemoryCacheBackend, NullCacheBackend};
use stash_domain::error::{Error, Result};
use stash_domain::ports::providers::cache::CacheBackend;
use stash_domain::value_objects::{BackendConfig, BackendKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds one backend from the shared configuration
pub type BackendConstructor = fn(&BackendConfig) -> Result<Arc<dyn CacheBackend>>;

fn build_memory(config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
    Ok(Arc::new(MemoryCacheBackend::with_capacity(
        config.memory.max_entries,
    )))
}

fn build_file(config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
    let file = config.file.as_ref().ok_or_else(|| {
        Error::configuration("The file backend requires a cache directory (cache.file.directory)")
    })?;
    Ok(Arc::new(FileCacheBackend::new(&file.directory)?))
}

#[cfg(feature = "cache-redis")]
fn build_remote(config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
    Ok(Arc::new(crate::cache::RedisCacheBackend::new(
        config.remote.clone(),
    )?))
}

#[cfg(not(feature = "cache-redis"))]
fn build_remote(_config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
    Err(Error::configuration(
        "The remote backend requires the 'cache-redis' feature",
    ))
}

fn build_null(_config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
    Ok(Arc::new(NullCacheBackend::new()))
}

/// Kind to constructor map
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    constructors: HashMap<BackendKind, BackendConstructor>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Registry holding every built-in backend
    pub fn new() -> Self {
        let mut constructors: HashMap<BackendKind, BackendConstructor> = HashMap::new();
        constructors.insert(BackendKind::Memory, build_memory);
        constructors.insert(BackendKind::File, build_file);
        constructors.insert(BackendKind::Remote, build_remote);
        constructors.insert(BackendKind::Null, build_null);
        Self { constructors }
    }

    /// Replace the constructor for `kind`
    pub fn register(&mut self, kind: BackendKind, constructor: BackendConstructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Build the backend for `kind`
    pub fn resolve(&self, kind: BackendKind, config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
        let constructor = self.constructors.get(&kind).ok_or_else(|| {
            Error::configuration(format!("No constructor registered for backend '{kind}'"))
        })?;
        let backend = constructor(config)?;
        tracing::info!(backend = %kind, "cache backend ready");
        Ok(backend)
    }

    /// Build the backend named `name`
    pub fn resolve_by_name(&self, name: &str, config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
        self.resolve(name.parse()?, config)
    }

    /// Registered kinds with their descriptions, in canonical order
    pub fn list(&self) -> Vec<(BackendKind, &'static str)> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.constructors.contains_key(kind))
            .map(|kind| (kind, kind.description()))
            .collect()
    }
}

/// Resolve a backend by name using the built-in registry
pub fn resolve_backend(name: &str, config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
    BackendRegistry::new().resolve_by_name(name, config)
}

/// List the built-in backends
pub fn list_backends() -> Vec<(BackendKind, &'static str)> {
    BackendRegistry::new().list()
}

//! Tests for backend resolution

use stash_domain::{BackendConfig, BackendKind, CacheBackend, FileBackendConfig};
use std::sync::Arc;
use stash_providers::{BackendRegistry, list_backends, resolve_backend};

#[test]
fn test_lists_every_kind() {
    let kinds: Vec<BackendKind> = list_backends().into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, BackendKind::ALL.to_vec());
}

#[tokio::test]
async fn test_resolves_memory_and_null() {
    let config = BackendConfig::default();
    assert_eq!(
        resolve_backend("memory", &config).unwrap().backend_name(),
        "memory"
    );
    assert_eq!(resolve_backend("null", &config).unwrap().backend_name(), "null");
}

#[tokio::test]
async fn test_resolves_file_with_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = BackendConfig {
        file: Some(FileBackendConfig::new(dir.path())),
        ..BackendConfig::default()
    };
    assert_eq!(resolve_backend("file", &config).unwrap().backend_name(), "file");
}

#[test]
fn test_file_without_directory_is_configuration_error() {
    let err = resolve_backend("file", &BackendConfig::default()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_unknown_name_fails_fast() {
    let err = resolve_backend("memcached", &BackendConfig::default()).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Available backends"));
}

#[tokio::test]
async fn test_registered_constructor_overrides_builtin() {
    let mut registry = BackendRegistry::new();
    registry.register(BackendKind::Memory, |_| {
        let backend: Arc<dyn CacheBackend> =
            Arc::new(stash_providers::cache::NullCacheBackend::new());
        Ok(backend)
    });
    let backend = registry
        .resolve(BackendKind::Memory, &BackendConfig::default())
        .unwrap();
    assert_eq!(backend.backend_name(), "null");
}

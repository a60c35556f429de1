//! Tests for the on-disk backend

use serde_json::json;
use stash_domain::{CacheBackend, Error};
use stash_providers::cache::FileCacheBackend;
use std::time::Duration;

fn backend() -> (tempfile::TempDir, FileCacheBackend) {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileCacheBackend::new(dir.path()).unwrap();
    (dir, backend)
}

#[tokio::test]
async fn test_round_trip() {
    let (_dir, backend) = backend();
    backend
        .set("stash:u:1", json!({"name": "Ann"}), None)
        .await
        .unwrap();

    assert_eq!(
        backend.get("stash:u:1").await.unwrap(),
        Some(json!({"name": "Ann"}))
    );
    assert!(backend.exists("stash:u:1").await.unwrap());
}

#[tokio::test]
async fn test_missing_key_is_miss() {
    let (_dir, backend) = backend();
    assert_eq!(backend.get("nope").await.unwrap(), None);
    assert_eq!(backend.get_strict("nope").await.unwrap(), None);
}

#[tokio::test]
async fn test_expired_envelope_is_miss_and_removed() {
    let (_dir, backend) = backend();
    backend
        .set("k", json!(1), Some(Duration::from_millis(20)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(backend.get("k").await.unwrap(), None);
    assert!(!backend.path_for("k").exists());
}

#[tokio::test]
async fn test_corrupt_envelope_is_miss_for_get() {
    let (_dir, backend) = backend();
    std::fs::write(backend.path_for("k"), b"{not json").unwrap();

    assert_eq!(backend.get("k").await.unwrap(), None);
    assert!(!backend.path_for("k").exists());
}

#[tokio::test]
async fn test_unreadable_envelope_is_miss() {
    let (_dir, backend) = backend();
    backend.set("other", json!(1), None).await.unwrap();
    std::fs::create_dir(backend.path_for("k")).unwrap();

    assert_eq!(backend.get("k").await.unwrap(), None);
    assert!(!backend.exists("k").await.unwrap());
    assert!(!backend.delete("k").await.unwrap());
    assert_eq!(backend.keys("*").await.unwrap(), vec!["other"]);
    assert!(matches!(
        backend.get_strict("k").await,
        Err(Error::Io { .. })
    ));
    assert_eq!(backend.stats().errors, 1);
}

#[tokio::test]
async fn test_corrupt_envelope_is_error_for_get_strict() {
    let (_dir, backend) = backend();
    std::fs::write(backend.path_for("k"), b"\x00\x01garbage").unwrap();

    let err = backend.get_strict("k").await.unwrap_err();
    match err {
        Error::CorruptEntry { key, .. } => assert_eq!(key, "k"),
        other => panic!("Expected CorruptEntry, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_dir, backend) = backend();
    backend.set("k", json!("v"), None).await.unwrap();

    assert!(backend.delete("k").await.unwrap());
    assert!(!backend.delete("k").await.unwrap());
}

#[tokio::test]
async fn test_keys_come_from_envelopes() {
    let (_dir, backend) = backend();
    for key in ["stash:user:1", "stash:user:2", "stash:order:1"] {
        backend.set(key, json!(key), None).await.unwrap();
    }

    assert_eq!(
        backend.keys("stash:user:?").await.unwrap(),
        vec!["stash:user:1", "stash:user:2"]
    );
}

#[tokio::test]
async fn test_clear_removes_all_files() {
    let (dir, backend) = backend();
    backend.set("a", json!(1), None).await.unwrap();
    backend.set("b", json!(2), None).await.unwrap();

    assert!(backend.clear().await.unwrap());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_reopen_sees_previous_values() {
    let dir = tempfile::tempdir().unwrap();
    FileCacheBackend::new(dir.path())
        .unwrap()
        .set("persist", json!([1, 2, 3]), None)
        .await
        .unwrap();

    let reopened = FileCacheBackend::new(dir.path()).unwrap();
    assert_eq!(reopened.get("persist").await.unwrap(), Some(json!([1, 2, 3])));
}

//! Tests for the null backend

use serde_json::json;
use stash_domain::CacheBackend;
use stash_providers::cache::NullCacheBackend;

#[tokio::test]
async fn test_writes_succeed_but_nothing_is_stored() {
    let backend = NullCacheBackend::new();
    assert!(backend.set("k", json!(1), None).await.unwrap());
    assert_eq!(backend.get("k").await.unwrap(), None);
    assert!(!backend.exists("k").await.unwrap());
    assert!(!backend.delete("k").await.unwrap());
    assert!(backend.keys("*").await.unwrap().is_empty());
    assert!(backend.clear().await.unwrap());
}

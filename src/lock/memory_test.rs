// ABOUTME: Tests for the in-memory counting lock backend.
// ABOUTME: Covers slot limits, release, stale expiry, key sweeping, and key independence.

use std::sync::Arc;
use std::time::Duration;

use super::{LockBackend, LockKey, LockOptions, MemoryLockBackend};

fn options(resources: u64, stale_ms: u64) -> LockOptions {
    LockOptions {
        resources,
        stale_lock_expiration: Duration::from_millis(stale_ms),
    }
}

#[tokio::test]
async fn test_grants_up_to_resources() {
    let backend = MemoryLockBackend::new();
    let key = LockKey::new("throttle", "Job", None);
    let opts = options(2, 60_000);

    assert!(backend.lock(&key, &opts).await.unwrap().is_some());
    assert!(backend.lock(&key, &opts).await.unwrap().is_some());
    assert!(backend.lock(&key, &opts).await.unwrap().is_none());
    assert_eq!(backend.held(&key).await, 2);
}

#[tokio::test]
async fn test_unlock_frees_slot() {
    let backend = MemoryLockBackend::new();
    let key = LockKey::new("throttle", "Job", None);
    let opts = options(1, 60_000);

    let token = backend.lock(&key, &opts).await.unwrap().unwrap();
    assert!(backend.lock(&key, &opts).await.unwrap().is_none());

    backend.unlock(&key, &token).await.unwrap();
    assert_eq!(backend.held(&key).await, 0);
    assert!(backend.lock(&key, &opts).await.unwrap().is_some());
}

#[tokio::test]
async fn test_unlock_idempotent() {
    let backend = MemoryLockBackend::new();
    let key = LockKey::new("throttle", "Job", None);

    let token = backend.lock(&key, &options(1, 60_000)).await.unwrap().unwrap();
    backend.unlock(&key, &token).await.unwrap();
    // Second release and release of a never-held key are both fine
    backend.unlock(&key, &token).await.unwrap();
    backend
        .unlock(&LockKey::new("throttle", "Other", None), &token)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stale_leases_are_reclaimed() {
    let backend = MemoryLockBackend::new();
    let key = LockKey::new("throttle", "Job", None);
    let opts = options(1, 30);

    assert!(backend.lock(&key, &opts).await.unwrap().is_some());
    assert!(backend.lock(&key, &opts).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(backend.held(&key).await, 0);
    assert!(backend.lock(&key, &opts).await.unwrap().is_some());
}

#[tokio::test]
async fn test_expired_keys_are_swept() {
    let backend = MemoryLockBackend::new();
    let opts = options(1, 30);

    for tenant in ["acme", "globex", "initech"] {
        let key = LockKey::new("throttle", "Job", Some(tenant));
        assert!(backend.lock(&key, &opts).await.unwrap().is_some());
    }
    assert_eq!(backend.tracked_keys().await, 3);

    tokio::time::sleep(Duration::from_millis(60)).await;

    let fresh = LockKey::new("throttle", "Job", Some("umbrella"));
    assert!(backend.lock(&fresh, &opts).await.unwrap().is_some());
    assert_eq!(backend.tracked_keys().await, 1);
}

#[tokio::test]
async fn test_unrepresentable_expiration_never_expires() {
    let backend = MemoryLockBackend::new();
    let key = LockKey::new("throttle", "Job", None);
    let opts = LockOptions {
        resources: 1,
        stale_lock_expiration: Duration::MAX,
    };

    assert!(backend.lock(&key, &opts).await.unwrap().is_some());
    assert!(backend.lock(&key, &opts).await.unwrap().is_none());
    assert_eq!(backend.held(&key).await, 1);
}

#[tokio::test]
async fn test_keys_are_independent() {
    let backend = MemoryLockBackend::new();
    let a = LockKey::new("throttle", "Job", Some("a"));
    let b = LockKey::new("throttle", "Job", Some("b"));
    let opts = options(1, 60_000);

    assert!(backend.lock(&a, &opts).await.unwrap().is_some());
    assert!(backend.lock(&a, &opts).await.unwrap().is_none());
    assert!(backend.lock(&b, &opts).await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_lock_respects_resources() {
    let backend = Arc::new(MemoryLockBackend::new());
    let key = LockKey::new("throttle", "Job", None);
    let mut handles = Vec::new();

    for _ in 0..20 {
        let backend = backend.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            backend.lock(&key, &options(3, 60_000)).await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            granted += 1;
        }
    }

    assert_eq!(granted, 3, "Expected exactly 3 grants, got {}", granted);
}

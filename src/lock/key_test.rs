// ABOUTME: Tests for lock key derivation.
// ABOUTME: Covers class-level keys, dynamic keys, and failing key selectors.

use std::time::Duration;

use async_trait::async_trait;

use super::LockKey;
use crate::error::TrafficControlError;
use crate::queue::Job;
use crate::throttle::ThrottlePolicy;

struct Export {
    tenant: String,
}

#[async_trait]
impl Job for Export {
    fn class_name(&self) -> &str {
        "Export"
    }

    async fn perform(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

fn export(tenant: &str) -> Export {
    Export {
        tenant: tenant.to_string(),
    }
}

#[test]
fn test_new_without_dynamic_key() {
    let key = LockKey::new("throttle", "Export", None);
    assert_eq!(key.as_str(), "throttle:Export");
}

#[test]
fn test_new_with_dynamic_key() {
    let key = LockKey::new("throttle", "Export", Some("acme"));
    assert_eq!(key.as_str(), "throttle:Export:acme");
    assert_eq!(key.to_string(), "throttle:Export:acme");
}

#[test]
fn test_derive_class_level_key_ignores_job_fields() {
    let policy = ThrottlePolicy::<Export>::builder(2, Duration::from_secs(10))
        .build()
        .unwrap();

    let a = LockKey::derive("throttle", &export("acme"), &policy).unwrap();
    let b = LockKey::derive("throttle", &export("globex"), &policy).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.as_str(), "throttle:Export");
}

#[test]
fn test_derive_dynamic_key_separates_domains() {
    let policy = ThrottlePolicy::<Export>::builder(2, Duration::from_secs(10))
        .key(|job| job.tenant.clone())
        .build()
        .unwrap();

    let a = LockKey::derive("throttle", &export("acme"), &policy).unwrap();
    let same = LockKey::derive("throttle", &export("acme"), &policy).unwrap();
    let b = LockKey::derive("throttle", &export("globex"), &policy).unwrap();

    assert_eq!(a, same);
    assert_ne!(a, b);
    assert_eq!(a.as_str(), "throttle:Export:acme");
    assert_eq!(b.as_str(), "throttle:Export:globex");
}

#[test]
fn test_derive_propagates_key_selector_failure() {
    let policy = ThrottlePolicy::<Export>::builder(2, Duration::from_secs(10))
        .try_key(|job| {
            if job.tenant.is_empty() {
                anyhow::bail!("job has no tenant");
            }
            Ok(job.tenant.clone())
        })
        .build()
        .unwrap();

    let result = LockKey::derive("throttle", &export(""), &policy);
    match result {
        Err(TrafficControlError::KeySelector(err)) => {
            assert!(err.to_string().contains("no tenant"));
        }
        other => panic!("Expected KeySelector error, got {:?}", other),
    }
}

// ABOUTME: Tests for ThrottlePolicy - validation, defaults, and builder options.
// ABOUTME: Verifies invalid configurations fail when the policy is built.

use std::time::Duration;

use super::*;
use crate::error::ConfigError;
use crate::lock::{LeaseHold, LockOptions};

struct Report;

#[test]
fn test_threshold_below_one_rejected() {
    for threshold in [0, -1, -100, i64::MIN] {
        let result = ThrottlePolicy::<Report>::builder(threshold, Duration::from_secs(1)).build();
        match result {
            Err(ConfigError::InvalidThreshold(value)) => assert_eq!(value, threshold),
            other => panic!("Expected InvalidThreshold for {}, got {:?}", threshold, other),
        }
    }
}

#[test]
fn test_threshold_one_and_large_accepted() {
    let one = ThrottlePolicy::<Report>::builder(1, Duration::from_secs(1))
        .build()
        .unwrap();
    assert_eq!(one.threshold(), 1);

    let large = ThrottlePolicy::<Report>::builder(1_000_000, Duration::from_secs(1))
        .build()
        .unwrap();
    assert_eq!(large.threshold(), 1_000_000);
}

#[test]
fn test_zero_period_rejected() {
    let result = ThrottlePolicy::<Report>::builder(1, Duration::ZERO).build();
    assert!(matches!(result, Err(ConfigError::InvalidPeriod(_))));
}

#[test]
fn test_period_beyond_max_rejected() {
    let six_centuries = Duration::from_secs(600 * 365 * 24 * 3600);
    let result = ThrottlePolicy::<Report>::builder(1, six_centuries).build();
    assert!(matches!(result, Err(ConfigError::InvalidPeriod(p)) if p == six_centuries));
}

#[test]
fn test_max_period_accepted_with_default_range() {
    let policy = ThrottlePolicy::<Report>::builder(1, MAX_PERIOD)
        .build()
        .unwrap();
    assert_eq!(
        policy.reenqueue_delay(),
        &ReenqueueDelay::Range(MAX_PERIOD..MAX_PERIOD * 5)
    );
}

#[test]
fn test_millis_saturates() {
    assert_eq!(millis(Duration::from_millis(1500)), 1500);
    assert_eq!(millis(Duration::MAX), u64::MAX);
}

#[test]
fn test_defaults() {
    let policy = ThrottlePolicy::<Report>::builder(3, Duration::from_secs(10))
        .build()
        .unwrap();

    assert!(!policy.drops());
    assert_eq!(policy.period(), Duration::from_secs(10));
    assert_eq!(policy.hold(), LeaseHold::UntilComplete);
    assert_eq!(policy.on_backend_error(), BackendErrorPolicy::Propagate);
    assert_eq!(
        policy.reenqueue_delay(),
        &ReenqueueDelay::Range(Duration::from_secs(10)..Duration::from_secs(50))
    );
    assert!(policy.dynamic_key(&Report).unwrap().is_none());
}

#[test]
fn test_lock_options_map_threshold_and_period() {
    let policy = ThrottlePolicy::<Report>::builder(4, Duration::from_secs(30))
        .build()
        .unwrap();

    assert_eq!(
        policy.lock_options(),
        LockOptions {
            resources: 4,
            stale_lock_expiration: Duration::from_secs(30),
        }
    );
}

#[test]
fn test_explicit_reenqueue_delay() {
    let fixed = ThrottlePolicy::<Report>::builder(1, Duration::from_secs(1))
        .reenqueue_delay(Duration::from_secs(7))
        .build()
        .unwrap();
    assert_eq!(
        fixed.reenqueue_delay(),
        &ReenqueueDelay::Fixed(Duration::from_secs(7))
    );

    let ranged = ThrottlePolicy::<Report>::builder(1, Duration::from_secs(1))
        .reenqueue_delay(Duration::from_secs(2)..Duration::from_secs(3))
        .build()
        .unwrap();
    assert_eq!(
        ranged.reenqueue_delay(),
        &ReenqueueDelay::Range(Duration::from_secs(2)..Duration::from_secs(3))
    );
}

#[test]
fn test_empty_reenqueue_range_rejected() {
    let result = ThrottlePolicy::<Report>::builder(1, Duration::from_secs(1))
        .reenqueue_delay(Duration::from_secs(3)..Duration::from_secs(3))
        .build();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidReenqueueDelay { .. })
    ));
}

#[test]
fn test_builder_options() {
    let policy = ThrottlePolicy::<Report>::builder(2, Duration::from_secs(1))
        .drop(true)
        .key(|_| "tenant-1".to_string())
        .hold(LeaseHold::UntilStale)
        .on_backend_error(BackendErrorPolicy::FailOpen)
        .build()
        .unwrap();

    assert!(policy.drops());
    assert_eq!(policy.hold(), LeaseHold::UntilStale);
    assert_eq!(policy.on_backend_error(), BackendErrorPolicy::FailOpen);
    assert_eq!(
        policy.dynamic_key(&Report).unwrap().as_deref(),
        Some("tenant-1")
    );

    let debug = format!("{:?}", policy);
    assert!(debug.contains("threshold: 2"));
    assert!(debug.contains("<fn>"));
}

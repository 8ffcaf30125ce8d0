// ABOUTME: Defines all error types for traffic-control using thiserror.
// ABOUTME: Each area has its own error enum, unified under TrafficControlError.

use std::time::Duration;

/// Top-level error type for throttled execution.
#[derive(Debug, thiserror::Error)]
pub enum TrafficControlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lock backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Key selector failed: {0}")]
    KeySelector(#[source] anyhow::Error),

    #[error("Job failed: {0}")]
    Job(#[source] anyhow::Error),

    #[error("Queue error: {0}")]
    Queue(#[source] anyhow::Error),
}

/// Errors raised while declaring or loading a throttle policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Threshold needs to be an integer > 0, got {0}")]
    InvalidThreshold(i64),

    #[error("Period {0:?} must be non-zero and at most {max:?}", max = crate::throttle::MAX_PERIOD)]
    InvalidPeriod(Duration),

    #[error("Reenqueue delay range {start:?}..{end:?} is empty")]
    InvalidReenqueueDelay { start: Duration, end: Duration },

    #[error("Invalid settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the distributed lock backend.
///
/// These are infrastructure faults. A lease that is simply not available is
/// reported as `LeaseOutcome::Denied`, never through this type.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Lock backend unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),

    #[error("Lock acquisition timed out after {0:?}")]
    Timeout(Duration),
}

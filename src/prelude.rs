// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use traffic_control::prelude::*;` to get started quickly.

pub use crate::config::{DelaySetting, ThrottleSettings};
pub use crate::error::{BackendError, ConfigError, TrafficControlError};
pub use crate::lock::{
    LeaseHold, LeaseOutcome, LeaseToken, LockBackend, LockClient, LockKey, LockOptions,
    MemoryLockBackend,
};
pub use crate::queue::{DroppedJob, Job, JobQueue, MemoryQueue};
pub use crate::throttle::{
    BackendErrorPolicy, Decision, Outcome, ReenqueueDelay, THROTTLE_NAMESPACE, THROTTLING,
    Throttle, ThrottlePolicy, ThrottlePolicyBuilder, decide,
};

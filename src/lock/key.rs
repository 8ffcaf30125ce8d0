// ABOUTME: Derives lock identities from a namespace, a job class, and a dynamic key.
// ABOUTME: Jobs mapping to the same identity share one concurrency budget.

use std::fmt;

use crate::error::TrafficControlError;
use crate::queue::Job;
use crate::throttle::ThrottlePolicy;

/// Identity of a throttling domain inside the lock backend.
///
/// Formatted as `namespace:class` or `namespace:class:dynamic`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Build a key from its parts.
    pub fn new(namespace: &str, class_name: &str, dynamic: Option<&str>) -> Self {
        match dynamic {
            Some(dynamic) => Self(format!("{}:{}:{}", namespace, class_name, dynamic)),
            None => Self(format!("{}:{}", namespace, class_name)),
        }
    }

    /// Derive the key for `job` under `policy`.
    ///
    /// Runs the policy's key selector when one is configured. A failing
    /// selector is reported as [`TrafficControlError::KeySelector`].
    pub fn derive<J: Job>(
        namespace: &str,
        job: &J,
        policy: &ThrottlePolicy<J>,
    ) -> Result<Self, TrafficControlError> {
        let dynamic = policy
            .dynamic_key(job)
            .map_err(TrafficControlError::KeySelector)?;
        Ok(Self::new(namespace, job.class_name(), dynamic.as_deref()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ABOUTME: Wraps job execution with the throttle - derive key, lease, decide, act.
// ABOUTME: The only place a throttled job's payload is invoked.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::{BackendErrorPolicy, Decision, ThrottlePolicy, decide, millis};
use crate::error::{BackendError, TrafficControlError};
use crate::lock::{LockBackend, LockClient, LockKey};
use crate::queue::{Job, JobQueue};

/// Namespace of every lock key taken by the throttle.
pub const THROTTLE_NAMESPACE: &str = "throttle";

/// What happened to one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The payload ran under a lease, or the class is not throttled.
    Performed,
    /// The lock backend failed and the policy let the payload run anyway.
    PerformedUnthrottled,
    /// The job was discarded.
    Dropped { reason: &'static str },
    /// The job was handed back to the queue.
    Reenqueued {
        delay: Duration,
        reason: &'static str,
    },
}

/// Execution interceptor for one job class.
///
/// Holds the class's policy (if any) and the shared lock backend. Cheap to
/// share across worker tasks behind an `Arc`.
pub struct Throttle<J> {
    backend: Arc<dyn LockBackend>,
    policy: Option<Arc<ThrottlePolicy<J>>>,
    acquire_timeout: Option<Duration>,
}

impl<J: Job> Throttle<J> {
    /// Throttle a job class with `policy`.
    pub fn new(backend: Arc<dyn LockBackend>, policy: ThrottlePolicy<J>) -> Self {
        Self {
            backend,
            policy: Some(Arc::new(policy)),
            acquire_timeout: None,
        }
    }

    /// Run a job class without throttling. The backend is never called.
    pub fn unthrottled(backend: Arc<dyn LockBackend>) -> Self {
        Self {
            backend,
            policy: None,
            acquire_timeout: None,
        }
    }

    /// Treat lock calls slower than `limit` as backend failures.
    pub fn with_acquire_timeout(mut self, limit: Duration) -> Self {
        self.acquire_timeout = Some(limit);
        self
    }

    /// The policy for this class, if throttled.
    pub fn policy(&self) -> Option<&ThrottlePolicy<J>> {
        self.policy.as_deref()
    }

    /// The lock key `job` would be throttled under.
    pub fn lock_key(&self, job: &J) -> Result<Option<LockKey>, TrafficControlError> {
        self.policy
            .as_deref()
            .map(|policy| LockKey::derive(THROTTLE_NAMESPACE, job, policy))
            .transpose()
    }

    /// Run one attempt of `job`, subject to the throttle.
    ///
    /// Returns the attempt's [`Outcome`]. Payload failures are returned as
    /// `TrafficControlError::Job`; lock backend failures as
    /// `TrafficControlError::Backend` unless the policy fails open.
    pub async fn perform(
        &self,
        job: &J,
        queue: &dyn JobQueue<J>,
    ) -> Result<Outcome, TrafficControlError> {
        let Some(policy) = self.policy.as_deref() else {
            debug!(class = job.class_name(), "class not throttled");
            job.perform().await.map_err(TrafficControlError::Job)?;
            return Ok(Outcome::Performed);
        };

        let key = LockKey::derive(THROTTLE_NAMESPACE, job, policy)?;
        let mut client = LockClient::new(
            self.backend.clone(),
            key.clone(),
            policy.lock_options(),
            policy.hold(),
        )
        .with_acquire_timeout(self.acquire_timeout);

        let lease = match client.lock().await {
            Ok(lease) => lease,
            Err(err) => return self.backend_failed(policy, &key, job, err).await,
        };

        let decision = decide(policy, &lease, &mut rand::thread_rng());

        match decision {
            Decision::Proceed => {
                debug!(lock_key = %key, "lease granted");
                let performed = AssertUnwindSafe(job.perform()).catch_unwind().await;

                if let Err(err) = client.close().await {
                    warn!(lock_key = %key, error = %err, "failed to release lease");
                }

                match performed {
                    Ok(result) => {
                        result.map_err(TrafficControlError::Job)?;
                        Ok(Outcome::Performed)
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Decision::Drop { reason } => {
                info!(lock_key = %key, reason, "job dropped");
                queue
                    .drop_job(job, reason)
                    .await
                    .map_err(TrafficControlError::Queue)?;
                Ok(Outcome::Dropped { reason })
            }
            Decision::Reenqueue { delay, reason } => {
                info!(
                    lock_key = %key,
                    reason,
                    delay_ms = millis(delay),
                    "job reenqueued"
                );
                queue
                    .reenqueue(job, delay, reason)
                    .await
                    .map_err(TrafficControlError::Queue)?;
                Ok(Outcome::Reenqueued { delay, reason })
            }
        }
    }

    async fn backend_failed(
        &self,
        policy: &ThrottlePolicy<J>,
        key: &LockKey,
        job: &J,
        err: BackendError,
    ) -> Result<Outcome, TrafficControlError> {
        match policy.on_backend_error() {
            BackendErrorPolicy::Propagate => {
                warn!(lock_key = %key, error = %err, "lock backend failed");
                Err(err.into())
            }
            BackendErrorPolicy::FailOpen => {
                warn!(lock_key = %key, error = %err, "lock backend failed, running unthrottled");
                job.perform().await.map_err(TrafficControlError::Job)?;
                Ok(Outcome::PerformedUnthrottled)
            }
        }
    }
}

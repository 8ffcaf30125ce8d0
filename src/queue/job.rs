// ABOUTME: Defines the Job and JobQueue traits - the worker framework boundary.
// ABOUTME: Jobs carry a class identity and a payload; queues drop or reenqueue.

use std::time::Duration;

use async_trait::async_trait;

/// A unit of work that may be throttled.
#[async_trait]
pub trait Job: Send + Sync {
    /// Returns the class identity shared by all jobs of this kind.
    ///
    /// Jobs with the same class name share a throttle budget unless the
    /// policy supplies a dynamic key.
    fn class_name(&self) -> &str;

    /// Run the job's payload.
    async fn perform(&self) -> Result<(), anyhow::Error>;
}

/// The queue collaborator that owns re-submission and discarding of jobs.
///
/// The `reason` argument is free text used only for observability.
#[async_trait]
pub trait JobQueue<J>: Send + Sync {
    /// Schedule a fresh attempt of `job` after `delay`.
    async fn reenqueue(&self, job: &J, delay: Duration, reason: &str)
    -> Result<(), anyhow::Error>;

    /// Permanently discard `job`.
    async fn drop_job(&self, job: &J, reason: &str) -> Result<(), anyhow::Error>;
}

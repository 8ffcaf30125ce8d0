// ABOUTME: In-memory job queue backed by a tokio channel.
// ABOUTME: Reenqueued jobs reappear after their delay; drops are recorded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{Job, JobQueue};
use crate::throttle::millis;

/// Record of a job discarded by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedJob {
    /// Class name of the dropped job.
    pub class_name: String,
    /// Reason given when the job was dropped.
    pub reason: String,
}

/// An unbounded in-process job queue.
///
/// Workers share the queue through an `Arc` and pull jobs with [`recv`].
/// A reenqueued job is held by a timer task and pushed back once its delay
/// elapses, so it comes back as a new attempt with no memory of the denial.
///
/// [`recv`]: MemoryQueue::recv
pub struct MemoryQueue<J> {
    tx: mpsc::UnboundedSender<J>,
    rx: Mutex<mpsc::UnboundedReceiver<J>>,
    dropped: Mutex<Vec<DroppedJob>>,
    reenqueued: AtomicUsize,
}

impl<J: Send + 'static> Default for MemoryQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: Send + 'static> MemoryQueue<J> {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            dropped: Mutex::new(Vec::new()),
            reenqueued: AtomicUsize::new(0),
        }
    }

    /// Push a job for immediate execution.
    pub fn push(&self, job: J) {
        // The queue owns its receiver, so the channel is open while `self` lives.
        let _ = self.tx.send(job);
    }

    /// Wait for the next job.
    ///
    /// Returns `None` only if every sender is gone, which cannot happen while
    /// the queue itself is alive; callers usually race this with a timeout.
    pub async fn recv(&self) -> Option<J> {
        self.rx.lock().await.recv().await
    }

    /// Take the next job if one is ready.
    pub async fn try_recv(&self) -> Option<J> {
        self.rx.lock().await.try_recv().ok()
    }

    /// Jobs dropped so far, in drop order.
    pub async fn dropped(&self) -> Vec<DroppedJob> {
        self.dropped.lock().await.clone()
    }

    /// Number of reenqueue requests accepted so far.
    pub fn reenqueued_count(&self) -> usize {
        self.reenqueued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<J> JobQueue<J> for MemoryQueue<J>
where
    J: Job + Clone + 'static,
{
    async fn reenqueue(
        &self,
        job: &J,
        delay: Duration,
        reason: &str,
    ) -> Result<(), anyhow::Error> {
        let tx = self.tx.clone();
        let job = job.clone();
        self.reenqueued.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            class = job.class_name(),
            reason,
            delay_ms = millis(delay),
            "scheduling job re-submission"
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(job).is_err() {
                tracing::debug!("queue closed before delayed job was re-submitted");
            }
        });

        Ok(())
    }

    async fn drop_job(&self, job: &J, reason: &str) -> Result<(), anyhow::Error> {
        self.dropped.lock().await.push(DroppedJob {
            class_name: job.class_name().to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }
}

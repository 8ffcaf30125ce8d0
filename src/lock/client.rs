// ABOUTME: Scoped lock client wrapping one backend, one lock key, and one lease.
// ABOUTME: Callers close the client on every exit path to give the lease back.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{LeaseOutcome, LeaseToken, LockBackend, LockKey, LockOptions};
use crate::error::BackendError;

/// How long a granted lease is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseHold {
    /// Release the lease when the client is closed. The threshold bounds
    /// how many jobs run at once.
    #[default]
    UntilComplete,
    /// Keep the lease until the backend expires it. The threshold bounds how
    /// many jobs start per stale window.
    UntilStale,
}

/// A lock client scoped to a single execution attempt.
///
/// # Lock Semantics
///
/// - **Idempotent lock:** once a lease is held, `lock()` returns it again
///   without another backend call.
/// - **Close releases:** `close()` unlocks a held lease when the hold is
///   [`LeaseHold::UntilComplete`], and leaves it to expire otherwise.
/// - **Drop releases:** a client dropped without `close()` (for example
///   when the attempt is cancelled) unlocks its lease on a spawned task.
pub struct LockClient {
    backend: Arc<dyn LockBackend>,
    key: LockKey,
    options: LockOptions,
    hold: LeaseHold,
    acquire_timeout: Option<Duration>,
    token: Option<LeaseToken>,
}

impl LockClient {
    /// Create a client for `key` on `backend`.
    pub fn new(
        backend: Arc<dyn LockBackend>,
        key: LockKey,
        options: LockOptions,
        hold: LeaseHold,
    ) -> Self {
        Self {
            backend,
            key,
            options,
            hold,
            acquire_timeout: None,
            token: None,
        }
    }

    /// Fail lock calls that take longer than `limit`.
    pub fn with_acquire_timeout(mut self, limit: Option<Duration>) -> Self {
        self.acquire_timeout = limit;
        self
    }

    /// The key this client locks.
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// The currently held lease, if any.
    pub fn token(&self) -> Option<&LeaseToken> {
        self.token.as_ref()
    }

    /// Request a lease from the backend.
    ///
    /// Returns `Ok(LeaseOutcome::Denied)` when the backend is at capacity.
    /// Returns `Err(BackendError)` when the backend fails or times out.
    pub async fn lock(&mut self) -> Result<LeaseOutcome, BackendError> {
        if let Some(token) = &self.token {
            return Ok(LeaseOutcome::Granted(token.clone()));
        }

        let acquire = self.backend.lock(&self.key, &self.options);
        let granted = match self.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| BackendError::Timeout(limit))??,
            None => acquire.await?,
        };

        match granted {
            Some(token) => {
                self.token = Some(token.clone());
                Ok(LeaseOutcome::Granted(token))
            }
            None => Ok(LeaseOutcome::Denied),
        }
    }

    /// End the scope, releasing the lease according to the hold.
    pub async fn close(mut self) -> Result<(), BackendError> {
        match (self.hold, self.token.take()) {
            (LeaseHold::UntilComplete, Some(token)) => {
                self.backend.unlock(&self.key, &token).await
            }
            _ => Ok(()),
        }
    }
}

impl Drop for LockClient {
    fn drop(&mut self) {
        if self.hold != LeaseHold::UntilComplete {
            return;
        }
        let Some(token) = self.token.take() else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(lock_key = %self.key, "no runtime to release dropped lease, leaving it to expire");
            return;
        };

        let backend = self.backend.clone();
        let key = self.key.clone();
        runtime.spawn(async move {
            if let Err(err) = backend.unlock(&key, &token).await {
                tracing::warn!(lock_key = %key, error = %err, "failed to release dropped lease");
            }
        });
    }
}

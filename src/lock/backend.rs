// ABOUTME: Defines the LockBackend trait - the capability of a distributed lock service.
// ABOUTME: Also holds lease tokens, lock options, and lease outcomes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::LockKey;
use crate::error::BackendError;

/// Opaque grant returned by a lock backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseToken(String);

impl LeaseToken {
    /// Wrap a backend-provided token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters passed through to the backend on every lock call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Maximum number of leases the backend may grant concurrently for a key.
    pub resources: u64,
    /// Window after which an unreleased lease is treated as abandoned.
    pub stale_lock_expiration: Duration,
}

/// Result of a lease request that reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// A lease slot was granted.
    Granted(LeaseToken),
    /// Every slot is taken.
    Denied,
}

impl LeaseOutcome {
    /// Returns true if a lease was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, LeaseOutcome::Granted(_))
    }
}

/// A distributed lock service handing out counting leases.
///
/// Implementations enforce the concurrency bound, expire stale leases, and
/// decide grant or deny atomically for callers that may live in other
/// processes or hosts. Backends must report transport or service faults as
/// `Err`, never as a denied lease.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Try to take one lease on `key`.
    ///
    /// Returns `Ok(Some(token))` when granted and `Ok(None)` when all
    /// `options.resources` slots are in use.
    async fn lock(
        &self,
        key: &LockKey,
        options: &LockOptions,
    ) -> Result<Option<LeaseToken>, BackendError>;

    /// Give back a lease. Unknown or expired tokens are not an error.
    async fn unlock(&self, key: &LockKey, token: &LeaseToken) -> Result<(), BackendError>;
}

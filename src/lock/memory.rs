// ABOUTME: In-memory counting lock backend for tests and single-process fleets.
// ABOUTME: Grants up to `resources` leases per key and reclaims stale ones.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LeaseToken, LockBackend, LockKey, LockOptions};
use crate::error::BackendError;

/// A lease held in the memory backend.
#[derive(Debug, Clone)]
struct Lease {
    token: LeaseToken,
    /// `None` when the window is too long to represent as an `Instant`.
    expires_at: Option<Instant>,
}

impl Lease {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Counting lease table shared by every worker task in the process.
///
/// Each key has its own set of slots. A lease that is not released within
/// its `stale_lock_expiration` stops counting against the key. Expired
/// leases, and keys left without live leases, are swept on every lock call.
#[derive(Default)]
pub struct MemoryLockBackend {
    leases: Mutex<HashMap<LockKey, Vec<Lease>>>,
}

impl MemoryLockBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live leases on `key` (for testing/monitoring).
    pub async fn held(&self, key: &LockKey) -> usize {
        let leases = self.leases.lock().await;
        let now = Instant::now();
        leases
            .get(key)
            .map(|slots| slots.iter().filter(|lease| lease.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Number of keys currently tracked (for testing/monitoring).
    pub async fn tracked_keys(&self) -> usize {
        self.leases.lock().await.len()
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn lock(
        &self,
        key: &LockKey,
        options: &LockOptions,
    ) -> Result<Option<LeaseToken>, BackendError> {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        leases.retain(|_, slots| {
            slots.retain(|lease| lease.is_live(now));
            !slots.is_empty()
        });

        let held = leases.get(key).map_or(0, Vec::len);
        if held >= options.resources as usize {
            return Ok(None);
        }

        let token = LeaseToken::generate();
        leases.entry(key.clone()).or_default().push(Lease {
            token: token.clone(),
            expires_at: now.checked_add(options.stale_lock_expiration),
        });

        Ok(Some(token))
    }

    async fn unlock(&self, key: &LockKey, token: &LeaseToken) -> Result<(), BackendError> {
        let mut leases = self.leases.lock().await;

        if let Some(slots) = leases.get_mut(key) {
            slots.retain(|lease| &lease.token != token);
            if slots.is_empty() {
                leases.remove(key);
            }
        }

        // Idempotent: unknown or expired tokens are fine
        Ok(())
    }
}

// ABOUTME: Defines throttle policies - threshold, window, drop flag, key, and delay.
// ABOUTME: Policies are validated once by the builder and immutable afterwards.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lock::{LeaseHold, LockOptions};

/// A key selector supplying the dynamic part of a lock key.
pub type KeyFn<J> = Arc<dyn Fn(&J) -> Result<String, anyhow::Error> + Send + Sync>;

/// Longest accepted period. The default reenqueue window ends at five
/// periods and must still be sampleable in nanoseconds.
pub const MAX_PERIOD: Duration = Duration::from_nanos(u64::MAX / 5);

/// Delay before a throttled job is tried again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReenqueueDelay {
    /// Always wait exactly this long.
    Fixed(Duration),
    /// Wait a uniformly sampled duration from this half-open range.
    Range(Range<Duration>),
}

impl ReenqueueDelay {
    /// The default window: `[period, period * 5)`.
    pub fn for_period(period: Duration) -> Self {
        ReenqueueDelay::Range(period..period.saturating_mul(5))
    }

    /// Pick a delay. Ranges are resampled on every call so that many
    /// denied jobs do not come back at the same instant.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match self {
            ReenqueueDelay::Fixed(delay) => *delay,
            ReenqueueDelay::Range(range) => {
                Duration::from_nanos(rng.gen_range(nanos(range.start)..nanos(range.end)))
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ReenqueueDelay::Range(range) if nanos(range.start) >= nanos(range.end) => {
                Err(ConfigError::InvalidReenqueueDelay {
                    start: range.start,
                    end: range.end,
                })
            }
            _ => Ok(()),
        }
    }
}

impl From<Duration> for ReenqueueDelay {
    fn from(delay: Duration) -> Self {
        ReenqueueDelay::Fixed(delay)
    }
}

impl From<Range<Duration>> for ReenqueueDelay {
    fn from(range: Range<Duration>) -> Self {
        ReenqueueDelay::Range(range)
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Whole milliseconds of `duration`, clamped to `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What to do when the lock backend itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorPolicy {
    /// Return the backend error to the caller.
    #[default]
    Propagate,
    /// Run the job without a lease.
    FailOpen,
}

/// Throttling configuration for one job class.
pub struct ThrottlePolicy<J> {
    threshold: u64,
    period: Duration,
    drop: bool,
    key: Option<KeyFn<J>>,
    reenqueue_delay: ReenqueueDelay,
    hold: LeaseHold,
    on_backend_error: BackendErrorPolicy,
}

impl<J> ThrottlePolicy<J> {
    /// Create a new policy builder.
    ///
    /// `threshold` is the number of leases allowed per lock key and
    /// `period` is the lease staleness window.
    pub fn builder(threshold: i64, period: Duration) -> ThrottlePolicyBuilder<J> {
        ThrottlePolicyBuilder::new(threshold, period)
    }

    /// Maximum concurrent leases per lock key.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Lease staleness window.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether denied jobs are dropped instead of reenqueued.
    pub fn drops(&self) -> bool {
        self.drop
    }

    /// Delay applied to reenqueued jobs.
    pub fn reenqueue_delay(&self) -> &ReenqueueDelay {
        &self.reenqueue_delay
    }

    /// How long granted leases are held.
    pub fn hold(&self) -> LeaseHold {
        self.hold
    }

    /// Behaviour on lock backend failure.
    pub fn on_backend_error(&self) -> BackendErrorPolicy {
        self.on_backend_error
    }

    /// Options passed to the lock backend.
    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            resources: self.threshold,
            stale_lock_expiration: self.period,
        }
    }

    /// Run the key selector for `job`, if one is configured.
    pub fn dynamic_key(&self, job: &J) -> Result<Option<String>, anyhow::Error> {
        self.key.as_ref().map(|key| key(job)).transpose()
    }
}

impl<J> fmt::Debug for ThrottlePolicy<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottlePolicy")
            .field("threshold", &self.threshold)
            .field("period", &self.period)
            .field("drop", &self.drop)
            .field("key", &self.key.as_ref().map(|_| "<fn>"))
            .field("reenqueue_delay", &self.reenqueue_delay)
            .field("hold", &self.hold)
            .field("on_backend_error", &self.on_backend_error)
            .finish()
    }
}

/// Builder for constructing throttle policies.
pub struct ThrottlePolicyBuilder<J> {
    threshold: i64,
    period: Duration,
    drop: bool,
    key: Option<KeyFn<J>>,
    reenqueue_delay: Option<ReenqueueDelay>,
    hold: LeaseHold,
    on_backend_error: BackendErrorPolicy,
}

impl<J> ThrottlePolicyBuilder<J> {
    /// Create a builder with the required threshold and period.
    pub fn new(threshold: i64, period: Duration) -> Self {
        Self {
            threshold,
            period,
            drop: false,
            key: None,
            reenqueue_delay: None,
            hold: LeaseHold::default(),
            on_backend_error: BackendErrorPolicy::default(),
        }
    }

    /// Drop denied jobs instead of reenqueueing them.
    pub fn drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }

    /// Throttle per value returned by `key` instead of per class.
    pub fn key<F>(mut self, key: F) -> Self
    where
        F: Fn(&J) -> String + Send + Sync + 'static,
        J: 'static,
    {
        self.key = Some(Arc::new(move |job: &J| Ok::<_, anyhow::Error>(key(job))));
        self
    }

    /// Like [`key`](Self::key), for selectors that can fail.
    pub fn try_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&J) -> Result<String, anyhow::Error> + Send + Sync + 'static,
    {
        self.key = Some(Arc::new(key));
        self
    }

    /// Override the default `[period, period * 5)` reenqueue window.
    pub fn reenqueue_delay(mut self, delay: impl Into<ReenqueueDelay>) -> Self {
        self.reenqueue_delay = Some(delay.into());
        self
    }

    /// Set how long granted leases are held.
    pub fn hold(mut self, hold: LeaseHold) -> Self {
        self.hold = hold;
        self
    }

    /// Set the behaviour on lock backend failure.
    pub fn on_backend_error(mut self, policy: BackendErrorPolicy) -> Self {
        self.on_backend_error = policy;
        self
    }

    /// Validate and build the policy.
    ///
    /// Returns `Err(ConfigError::InvalidThreshold)` if the threshold is below 1
    /// and `Err(ConfigError::InvalidPeriod)` if the period is zero or longer
    /// than [`MAX_PERIOD`].
    pub fn build(self) -> Result<ThrottlePolicy<J>, ConfigError> {
        if self.threshold < 1 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.period.is_zero() || self.period > MAX_PERIOD {
            return Err(ConfigError::InvalidPeriod(self.period));
        }

        let reenqueue_delay = self
            .reenqueue_delay
            .unwrap_or_else(|| ReenqueueDelay::for_period(self.period));
        reenqueue_delay.validate()?;

        Ok(ThrottlePolicy {
            threshold: self.threshold as u64,
            period: self.period,
            drop: self.drop,
            key: self.key,
            reenqueue_delay,
            hold: self.hold,
            on_backend_error: self.on_backend_error,
        })
    }
}

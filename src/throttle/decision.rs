// ABOUTME: The admission decision - proceed, drop, or reenqueue after a lease request.
// ABOUTME: Pure function of the policy, the lease outcome, and a random source.

use std::time::Duration;

use rand::Rng;

use super::ThrottlePolicy;
use crate::lock::LeaseOutcome;

/// Reason reported for every job turned away by the throttle.
pub const THROTTLING: &str = "throttling";

/// The decision made for one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run the job.
    Proceed,
    /// Discard the job without running it.
    Drop { reason: &'static str },
    /// Run the job again later.
    Reenqueue {
        delay: Duration,
        reason: &'static str,
    },
}

/// Decide what to do with a job given the outcome of its lease request.
///
/// A denied lease is the normal result under load, not a failure.
pub fn decide<J, R>(policy: &ThrottlePolicy<J>, outcome: &LeaseOutcome, rng: &mut R) -> Decision
where
    R: Rng + ?Sized,
{
    match outcome {
        LeaseOutcome::Granted(_) => Decision::Proceed,
        LeaseOutcome::Denied if policy.drops() => Decision::Drop { reason: THROTTLING },
        LeaseOutcome::Denied => Decision::Reenqueue {
            delay: policy.reenqueue_delay().sample(rng),
            reason: THROTTLING,
        },
    }
}

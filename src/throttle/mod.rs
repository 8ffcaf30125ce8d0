// ABOUTME: Throttle module - policies, the admission decision, and the interceptor.
// ABOUTME: Bounds concurrent job execution through a shared lock backend.

mod decision;
mod interceptor;
mod policy;

pub use decision::*;
pub use interceptor::*;
pub use policy::*;
pub(crate) use policy::millis;

#[cfg(test)]
mod policy_test;

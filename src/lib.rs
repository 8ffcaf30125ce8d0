// ABOUTME: Root module for traffic-control - distributed job execution throttling.
// ABOUTME: Re-exports all public types from submodules.

pub mod config;
pub mod error;
pub mod lock;
pub mod prelude;
pub mod queue;
pub mod throttle;

pub use error::TrafficControlError;

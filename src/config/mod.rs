// ABOUTME: Config module - serialized throttle settings loaded from JSON.
// ABOUTME: Settings turn into validated policies through the policy builder.

mod settings;

pub use settings::*;

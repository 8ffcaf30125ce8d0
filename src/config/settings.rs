// ABOUTME: Serializable throttle settings for one job class.
// ABOUTME: Loads from JSON strings or files and converts into ThrottlePolicy.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lock::LeaseHold;
use crate::throttle::{BackendErrorPolicy, ReenqueueDelay, ThrottlePolicy, ThrottlePolicyBuilder};

/// Reenqueue delay as written in settings, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelaySetting {
    /// A fixed delay.
    Fixed(u64),
    /// A half-open range `[min, max)`.
    Range { min: u64, max: u64 },
}

impl From<DelaySetting> for ReenqueueDelay {
    fn from(setting: DelaySetting) -> Self {
        match setting {
            DelaySetting::Fixed(ms) => ReenqueueDelay::Fixed(Duration::from_millis(ms)),
            DelaySetting::Range { min, max } => {
                ReenqueueDelay::Range(Duration::from_millis(min)..Duration::from_millis(max))
            }
        }
    }
}

/// Throttle settings for a job class.
///
/// ```json
/// { "threshold": 2, "period_ms": 10000, "drop": false,
///   "reenqueue_delay_ms": { "min": 1000, "max": 5000 } }
/// ```
///
/// Key selectors are code, so they are added to the builder returned by
/// [`builder`](Self::builder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleSettings {
    pub threshold: i64,
    pub period_ms: u64,
    #[serde(default)]
    pub drop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reenqueue_delay_ms: Option<DelaySetting>,
    #[serde(default)]
    pub hold: LeaseHold,
    #[serde(default)]
    pub on_backend_error: BackendErrorPolicy,
}

impl ThrottleSettings {
    /// Parse settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The lease staleness window.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// A policy builder pre-filled with these settings.
    pub fn builder<J>(&self) -> ThrottlePolicyBuilder<J> {
        let mut builder = ThrottlePolicy::builder(self.threshold, self.period())
            .drop(self.drop)
            .hold(self.hold)
            .on_backend_error(self.on_backend_error);

        if let Some(delay) = self.reenqueue_delay_ms {
            builder = builder.reenqueue_delay(delay);
        }

        builder
    }

    /// Validate the settings and build a class-level policy.
    pub fn to_policy<J>(&self) -> Result<ThrottlePolicy<J>, ConfigError> {
        self.builder().build()
    }
}

//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Upper bound for a resource's backoff multiplier
pub const MAX_BACKOFF_MULTIPLIER: f64 = 5.0;

/// Upper bound for any single pacing sleep
pub const MAX_PACING_DELAY: Duration = Duration::from_secs(10);

/// Longest accepted run budget in seconds (one year)
pub const MAX_RUN_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Scheduler configuration
///
/// Unknown keys are rejected when parsing; out-of-range numbers are replaced
/// by their defaults in [`SchedulerConfig::validated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Lower pacing bound in seconds
    #[serde(rename = "interval-min", default = "default_interval_min")]
    pub interval_min: f64,

    /// Upper pacing bound in seconds
    #[serde(rename = "interval-max", default = "default_interval_max")]
    pub interval_max: f64,

    /// Attempts per resource before it is parked (0 = unbounded)
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Shuffle the attempt order every round
    #[serde(default = "default_randomize")]
    pub randomize: bool,

    /// Multiplier applied to the pacing bounds after a failed attempt
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Overall run budget in seconds (0 = unbounded)
    #[serde(rename = "max-duration", default)]
    pub max_duration: u64,
}

fn default_interval_min() -> f64 {
    1.0
}

fn default_interval_max() -> f64 {
    3.0
}

fn default_max_attempts() -> u32 {
    100
}

fn default_randomize() -> bool {
    true
}

fn default_backoff_factor() -> f64 {
    1.5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_min: 1.0,
            interval_max: 3.0,
            max_attempts: 100,
            randomize: true,
            backoff_factor: 1.5,
            max_duration: 0,
        }
    }
}

impl SchedulerConfig {
    /// Replace invalid numeric settings with their defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if !is_valid_interval(self.interval_min) {
            warn!(interval_min = self.interval_min, "Invalid interval-min, using default");
            self.interval_min = defaults.interval_min;
        }
        if !is_valid_interval(self.interval_max) {
            warn!(interval_max = self.interval_max, "Invalid interval-max, using default");
            self.interval_max = defaults.interval_max;
        }
        if self.interval_max < self.interval_min {
            warn!(
                interval_min = self.interval_min,
                interval_max = self.interval_max,
                "interval-max below interval-min, using default bounds"
            );
            self.interval_min = defaults.interval_min;
            self.interval_max = defaults.interval_max;
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            warn!(backoff_factor = self.backoff_factor, "Invalid backoff-factor, using default");
            self.backoff_factor = defaults.backoff_factor;
        }
        if self.max_duration > MAX_RUN_DURATION_SECS {
            warn!(max_duration = self.max_duration, "max-duration out of range, using default");
            self.max_duration = defaults.max_duration;
        }

        self
    }

    /// Run budget, or `None` when unbounded
    pub fn max_duration(&self) -> Option<Duration> {
        (self.max_duration > 0).then(|| Duration::from_secs(self.max_duration))
    }
}

fn is_valid_interval(secs: f64) -> bool {
    secs.is_finite() && secs >= 0.0
}

//! Per-resource attempt counting and multiplicative backoff
//!
//! Each resource carries its own multiplier. A failed attempt multiplies it
//! by the configured factor (never past [`MAX_BACKOFF_MULTIPLIER`]); a
//! success resets it. The pause after an attempt is drawn uniformly from the
//! configured interval scaled by that multiplier and capped at
//! [`MAX_PACING_DELAY`].

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use targetstore::TargetResource;
use tracing::debug;

use crate::client::AttemptOutcome;

use super::config::{MAX_BACKOFF_MULTIPLIER, MAX_PACING_DELAY, SchedulerConfig};

/// In-memory run state of one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRunState {
    /// Attempts made in this run
    pub attempts: u32,
    /// Current pacing multiplier, in `[1.0, MAX_BACKOFF_MULTIPLIER]`
    pub backoff_multiplier: f64,
    /// Seat obtained; never reset within a run
    pub acquired: bool,
}

impl Default for ResourceRunState {
    fn default() -> Self {
        Self {
            attempts: 0,
            backoff_multiplier: 1.0,
            acquired: false,
        }
    }
}

impl ResourceRunState {
    /// Grow the multiplier after a failed attempt
    pub fn record_failure(&mut self, backoff_factor: f64) {
        self.backoff_multiplier = (self.backoff_multiplier * backoff_factor).clamp(1.0, MAX_BACKOFF_MULTIPLIER);
    }

    /// Mark the seat obtained and reset the multiplier
    pub fn record_success(&mut self) {
        self.acquired = true;
        self.backoff_multiplier = 1.0;
    }

    /// Attempt ceiling reached (`max_attempts == 0` means unbounded)
    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        max_attempts > 0 && self.attempts >= max_attempts
    }
}

/// Tracks [`ResourceRunState`] for every target of a run
#[derive(Debug)]
pub struct BackoffController {
    interval_min: f64,
    interval_max: f64,
    max_attempts: u32,
    backoff_factor: f64,
    states: HashMap<String, ResourceRunState>,
}

impl BackoffController {
    /// Fresh state for each target
    pub fn new(config: &SchedulerConfig, targets: &[TargetResource]) -> Self {
        debug!(targets = targets.len(), "BackoffController::new: called");
        Self {
            interval_min: config.interval_min,
            interval_max: config.interval_max,
            max_attempts: config.max_attempts,
            backoff_factor: config.backoff_factor,
            states: targets
                .iter()
                .map(|t| (t.resource_id.clone(), ResourceRunState::default()))
                .collect(),
        }
    }

    pub fn state(&self, resource_id: &str) -> Option<&ResourceRunState> {
        self.states.get(resource_id)
    }

    pub fn is_acquired(&self, resource_id: &str) -> bool {
        self.states.get(resource_id).is_some_and(|s| s.acquired)
    }

    pub fn is_exhausted(&self, resource_id: &str) -> bool {
        self.states
            .get(resource_id)
            .is_some_and(|s| !s.acquired && s.is_exhausted(self.max_attempts))
    }

    /// Every target acquired
    pub fn all_acquired(&self) -> bool {
        self.states.values().all(|s| s.acquired)
    }

    /// Every target either acquired or parked at its ceiling
    pub fn all_settled(&self) -> bool {
        self.states
            .values()
            .all(|s| s.acquired || s.is_exhausted(self.max_attempts))
    }

    /// Mark a target acquired without an attempt (carried over from a prior run)
    pub fn mark_acquired(&mut self, resource_id: &str) -> bool {
        match self.states.get_mut(resource_id) {
            Some(state) => {
                state.record_success();
                true
            }
            None => false,
        }
    }

    /// Count a new attempt and return its 1-based number
    pub fn begin_attempt(&mut self, resource_id: &str) -> u32 {
        let state = self.states.entry(resource_id.to_string()).or_default();
        state.attempts += 1;
        state.attempts
    }

    /// Apply an attempt's outcome to the resource's state
    pub fn record(&mut self, resource_id: &str, outcome: &AttemptOutcome) {
        let factor = self.backoff_factor;
        let state = self.states.entry(resource_id.to_string()).or_default();
        if outcome.is_acquired() {
            state.record_success();
        } else {
            state.record_failure(factor);
        }
        debug!(
            %resource_id,
            attempts = state.attempts,
            multiplier = state.backoff_multiplier,
            acquired = state.acquired,
            "BackoffController::record"
        );
    }

    /// Pause to insert after an attempt on this resource
    pub fn pacing_delay<R: Rng + ?Sized>(&self, resource_id: &str, rng: &mut R) -> Duration {
        let multiplier = self
            .states
            .get(resource_id)
            .map(|s| s.backoff_multiplier)
            .unwrap_or(1.0);
        pacing_delay(self.interval_min, self.interval_max, multiplier, rng)
    }

    /// Pause between two full rounds (no backoff applied)
    pub fn round_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        pacing_delay(self.interval_min, self.interval_max, 1.0, rng)
    }

    /// Attempts made per resource
    pub fn attempts(&self) -> impl Iterator<Item = (&str, u32)> {
        self.states.iter().map(|(id, s)| (id.as_str(), s.attempts))
    }

    /// Resources parked at their ceiling without a seat
    pub fn exhausted(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .states
            .iter()
            .filter(|(_, s)| !s.acquired && s.is_exhausted(self.max_attempts))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Uniform draw from `[min * multiplier, max * multiplier]`, capped at [`MAX_PACING_DELAY`]
pub fn pacing_delay<R: Rng + ?Sized>(interval_min: f64, interval_max: f64, multiplier: f64, rng: &mut R) -> Duration {
    let cap = MAX_PACING_DELAY.as_secs_f64();
    let low = (interval_min * multiplier).max(0.0);
    let high = (interval_max * multiplier).max(low);

    if !low.is_finite() || !high.is_finite() {
        return MAX_PACING_DELAY;
    }

    let secs = if high > low { rng.random_range(low..=high) } else { low };
    Duration::from_secs_f64(secs.min(cap))
}

//! Scheduler core: the round loop
//!
//! One run makes strictly sequential attempts. Each round visits every target
//! not yet acquired (shuffled when `randomize` is on), pausing after each
//! attempt for a backoff-scaled delay, then pauses once more before the next
//! round. Stop conditions are checked at the start of every round and before
//! every attempt.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use targetstore::{TargetResource, TargetStatus, TargetStore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::BackoffController;
use super::config::SchedulerConfig;
use super::stats::{CompletionReason, RunState, RunStatistics};
use crate::client::{AcquisitionClient, AttemptOutcome};
use crate::events::{EventBus, EventEmitter};
use crate::interrupt::sleep_or_cancel;

/// Status message written for every target when a run starts
const WAITING_MESSAGE: &str = "waiting for a seat";

/// Runs acquisition rounds until every target is acquired or a stop condition hits
pub struct Scheduler {
    config: SchedulerConfig,
    client: Arc<dyn AcquisitionClient>,
    token: CancellationToken,
    store: Option<TargetStore>,
    events: Option<Arc<EventBus>>,
    rng: StdRng,
    carried_over: HashSet<String>,
    state: RunState,
}

impl Scheduler {
    /// Create a scheduler; invalid config values fall back to defaults
    pub fn new(config: SchedulerConfig, client: Arc<dyn AcquisitionClient>, token: CancellationToken) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self {
            config: config.validated(),
            client,
            token,
            store: None,
            events: None,
            rng: StdRng::from_rng(&mut rand::rng()),
            carried_over: HashSet::new(),
            state: RunState::Idle,
        }
    }

    /// Persist a status record for every attempt
    pub fn with_store(mut self, store: TargetStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Publish run events on this bus
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Deterministic shuffling and pacing
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Treat these targets as already acquired (e.g. by an earlier run)
    pub fn with_acquired<I, S>(mut self, resource_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.carried_over.extend(resource_ids.into_iter().map(Into::into));
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run until all targets are acquired, the deadline passes, the token is
    /// cancelled, or every remaining target is exhausted
    pub async fn run(&mut self, targets: Vec<TargetResource>) -> RunStatistics {
        let targets = dedupe(targets);
        debug!(targets = targets.len(), "Scheduler::run: called");

        let mut stats = RunStatistics::start(targets.len());
        let emitter = match &self.events {
            Some(bus) => bus.emitter_for(&stats.run_id),
            None => EventBus::new(1).emitter_for(&stats.run_id),
        };
        let mut controller = BackoffController::new(&self.config, &targets);

        for target in &targets {
            if self.carried_over.contains(&target.resource_id) {
                controller.mark_acquired(&target.resource_id);
                stats.record_success(&target.resource_id, target.display_name());
            } else {
                self.persist(&target.resource_id, TargetStatus::Waiting, WAITING_MESSAGE);
            }
        }

        let pending = targets.len() - stats.successful;
        info!(run_id = %stats.run_id, total = targets.len(), pending, "Run started");
        emitter.run_started(targets.len(), pending);

        self.state = RunState::Running;
        let deadline = self
            .config
            .max_duration()
            .and_then(|d| Instant::now().checked_add(d));
        let reason = self.run_rounds(&targets, &mut controller, &mut stats, &emitter, deadline).await;

        stats.finalize(reason, controller.exhausted());
        self.state = RunState::Finished(reason);
        info!(
            run_id = %stats.run_id,
            %reason,
            attempts = stats.attempts,
            successful = stats.successful,
            duration_secs = stats.duration_secs,
            "Run finished"
        );
        emitter.run_finished(&stats);
        stats
    }

    async fn run_rounds(
        &mut self,
        targets: &[TargetResource],
        controller: &mut BackoffController,
        stats: &mut RunStatistics,
        emitter: &EventEmitter,
        deadline: Option<Instant>,
    ) -> CompletionReason {
        let mut round = 0u32;

        loop {
            if let Some(reason) = self.stop_reason(controller, deadline, true) {
                return reason;
            }

            round += 1;
            let mut pending: Vec<&TargetResource> = targets
                .iter()
                .filter(|t| !controller.is_acquired(&t.resource_id))
                .collect();
            if self.config.randomize {
                pending.shuffle(&mut self.rng);
            }
            debug!(round, pending = pending.len(), "Scheduler::run_rounds: round started");
            emitter.round_started(round, pending.len());

            for target in pending {
                if let Some(reason) = self.stop_reason(controller, deadline, false) {
                    return reason;
                }

                let id = target.resource_id.as_str();
                if controller.is_exhausted(id) {
                    debug!(%id, "Scheduler::run_rounds: skipping exhausted target");
                    continue;
                }

                let attempt = controller.begin_attempt(id);
                stats.record_attempt(id);
                emitter.attempt_started(round, id, target.display_name(), attempt);

                let outcome = self.attempt(target).await;

                controller.record(id, &outcome);
                if outcome.is_acquired() {
                    info!(%id, name = target.display_name(), attempt, "Seat acquired");
                    stats.record_success(id, target.display_name());
                } else {
                    debug!(%id, attempt, %outcome, "Attempt failed");
                }
                self.persist(id, outcome.status(), &outcome.to_string());
                emitter.attempt_finished(id, target.display_name(), attempt, &outcome);

                if controller.is_exhausted(id) {
                    info!(%id, attempts = attempt, "Attempt ceiling reached, parking target");
                    emitter.resource_exhausted(id, target.display_name(), attempt);
                }

                if controller.all_settled() || self.token.is_cancelled() {
                    continue;
                }
                let delay = controller.pacing_delay(id, &mut self.rng);
                self.pause(delay, deadline, Some(id), emitter).await;
            }

            if controller.all_settled() || self.token.is_cancelled() {
                continue;
            }
            let delay = controller.round_delay(&mut self.rng);
            self.pause(delay, deadline, None, emitter).await;
        }
    }

    /// First matching stop condition, in priority order
    fn stop_reason(
        &self,
        controller: &BackoffController,
        deadline: Option<Instant>,
        round_start: bool,
    ) -> Option<CompletionReason> {
        if controller.all_acquired() {
            return Some(CompletionReason::Completed);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(CompletionReason::TimedOut);
        }
        if self.token.is_cancelled() {
            return Some(CompletionReason::Cancelled);
        }
        if round_start && controller.all_settled() {
            return Some(CompletionReason::Exhausted);
        }
        None
    }

    /// One client call; errors become transient outcomes
    async fn attempt(&self, target: &TargetResource) -> AttemptOutcome {
        match self.client.attempt(target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(id = %target.resource_id, error = %e, "Acquisition client failed");
                e.into_outcome()
            }
        }
    }

    /// Sleep, but never past the deadline and never after cancellation
    async fn pause(&self, delay: Duration, deadline: Option<Instant>, resource_id: Option<&str>, emitter: &EventEmitter) {
        let delay = match deadline {
            Some(d) => delay.min(d.saturating_duration_since(Instant::now())),
            None => delay,
        };
        emitter.waiting(resource_id, delay.as_millis() as u64);
        if !sleep_or_cancel(delay, &self.token).await {
            debug!("Scheduler::pause: interrupted");
        }
    }

    fn persist(&self, resource_id: &str, status: TargetStatus, message: &str) {
        if let Some(store) = &self.store
            && let Err(e) = store.update_status(resource_id, status, message)
        {
            warn!(%resource_id, error = %e, "Failed to persist status, continuing in memory");
        }
    }
}

/// Keep the first occurrence of each resource id
fn dedupe(targets: Vec<TargetResource>) -> Vec<TargetResource> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| {
            let fresh = seen.insert(t.resource_id.clone());
            if !fresh {
                warn!(id = %t.resource_id, "Duplicate target ignored");
            }
            fresh
        })
        .collect()
}

//! Event Bus - pub/sub for scheduler run events
//!
//! The EventBus uses a tokio broadcast channel so the reporter and any other
//! subscriber see every event. The scheduler emits through an [`EventEmitter`]
//! bound to its run.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::RunEvent;
use crate::client::AttemptOutcome;
use crate::scheduler::RunStatistics;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Central event bus for run activity
pub struct EventBus {
    tx: broadcast::Sender<RunEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: RunEvent) {
        debug!(event_type = event.event_type(), run_id = event.run_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one run
    pub fn emitter_for(&self, run_id: impl Into<String>) -> EventEmitter {
        let run_id = run_id.into();
        debug!(%run_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            run_id,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for emitting events of one run without owning the bus
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<RunEvent>,
    run_id: String,
}

impl EventEmitter {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: RunEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    pub fn run_started(&self, total_targets: usize, pending: usize) {
        self.emit(RunEvent::RunStarted {
            run_id: self.run_id.clone(),
            total_targets,
            pending,
        });
    }

    pub fn round_started(&self, round: u32, pending: usize) {
        self.emit(RunEvent::RoundStarted {
            run_id: self.run_id.clone(),
            round,
            pending,
        });
    }

    pub fn attempt_started(&self, round: u32, resource_id: &str, name: &str, attempt: u32) {
        self.emit(RunEvent::AttemptStarted {
            run_id: self.run_id.clone(),
            round,
            resource_id: resource_id.to_string(),
            name: name.to_string(),
            attempt,
        });
    }

    pub fn attempt_finished(&self, resource_id: &str, name: &str, attempt: u32, outcome: &AttemptOutcome) {
        self.emit(RunEvent::AttemptFinished {
            run_id: self.run_id.clone(),
            resource_id: resource_id.to_string(),
            name: name.to_string(),
            attempt,
            outcome: outcome.clone(),
        });
    }

    pub fn resource_exhausted(&self, resource_id: &str, name: &str, attempts: u32) {
        self.emit(RunEvent::ResourceExhausted {
            run_id: self.run_id.clone(),
            resource_id: resource_id.to_string(),
            name: name.to_string(),
            attempts,
        });
    }

    pub fn waiting(&self, resource_id: Option<&str>, delay_ms: u64) {
        self.emit(RunEvent::Waiting {
            run_id: self.run_id.clone(),
            resource_id: resource_id.map(str::to_string),
            delay_ms,
        });
    }

    pub fn run_finished(&self, stats: &RunStatistics) {
        self.emit(RunEvent::RunFinished {
            run_id: self.run_id.clone(),
            stats: stats.clone(),
        });
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

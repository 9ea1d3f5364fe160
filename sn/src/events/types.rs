//! Run event types
//!
//! Everything a scheduler run does that a user may want to watch:
//! - Run lifecycle (start, finish)
//! - Rounds and the waits between them
//! - Attempts and their outcomes

use serde::{Deserialize, Serialize};

use crate::client::AttemptOutcome;
use crate::scheduler::RunStatistics;

/// Observable scheduler activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// A run has started
    RunStarted {
        run_id: String,
        total_targets: usize,
        /// Targets still to acquire (excludes ones carried over as acquired)
        pending: usize,
    },
    /// A new pass over the pending targets has started
    RoundStarted { run_id: String, round: u32, pending: usize },
    /// An attempt is about to be made
    AttemptStarted {
        run_id: String,
        round: u32,
        resource_id: String,
        name: String,
        attempt: u32,
    },
    /// An attempt returned
    AttemptFinished {
        run_id: String,
        resource_id: String,
        name: String,
        attempt: u32,
        outcome: AttemptOutcome,
    },
    /// A target reached its attempt ceiling and is parked
    ResourceExhausted {
        run_id: String,
        resource_id: String,
        name: String,
        attempts: u32,
    },
    /// The scheduler is pausing
    Waiting {
        run_id: String,
        /// Resource whose attempt triggered the pause; `None` between rounds
        resource_id: Option<String>,
        delay_ms: u64,
    },
    /// A run has stopped
    RunFinished { run_id: String, stats: RunStatistics },
}

impl RunEvent {
    /// Get the run ID for this event
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::RoundStarted { run_id, .. }
            | Self::AttemptStarted { run_id, .. }
            | Self::AttemptFinished { run_id, .. }
            | Self::ResourceExhausted { run_id, .. }
            | Self::Waiting { run_id, .. }
            | Self::RunFinished { run_id, .. } => run_id,
        }
    }

    /// Get the event type name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "RunStarted",
            Self::RoundStarted { .. } => "RoundStarted",
            Self::AttemptStarted { .. } => "AttemptStarted",
            Self::AttemptFinished { .. } => "AttemptFinished",
            Self::ResourceExhausted { .. } => "ResourceExhausted",
            Self::Waiting { .. } => "Waiting",
            Self::RunFinished { .. } => "RunFinished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_run_id_and_type() {
        let event = RunEvent::RoundStarted {
            run_id: "run-1".to_string(),
            round: 3,
            pending: 2,
        };
        assert_eq!(event.run_id(), "run-1");
        assert_eq!(event.event_type(), "RoundStarted");
    }

    #[test]
    fn test_event_serialization() {
        let event = RunEvent::AttemptFinished {
            run_id: "run-1".to_string(),
            resource_id: "A".to_string(),
            name: "Algebra".to_string(),
            attempt: 2,
            outcome: AttemptOutcome::rejected("section full"),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AttemptFinished");
        assert_eq!(json["outcome"]["outcome"], "rejected");
        assert_eq!(json["outcome"]["reason"], "section full");

        let back: RunEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

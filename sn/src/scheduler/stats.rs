//! Run lifecycle states and aggregate statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle of one scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Finished(CompletionReason),
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Finished(reason) => write!(f, "{}", reason),
        }
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Every target acquired
    Completed,
    /// `max-duration` elapsed
    TimedOut,
    /// Interrupted by the user
    Cancelled,
    /// Every remaining target hit its attempt ceiling
    Exhausted,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate counters for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub run_id: String,
    pub total_targets: usize,
    /// Attempts made across all targets
    pub attempts: u32,
    /// Targets acquired, including ones carried over with `--resume`
    pub successful: usize,
    pub course_attempts: BTreeMap<String, u32>,
    /// Acquired targets, id to name
    pub successful_courses: BTreeMap<String, String>,
    /// Targets parked at their attempt ceiling
    pub exhausted: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub reason: Option<CompletionReason>,
}

impl RunStatistics {
    /// Open statistics for a run over `total_targets` targets
    pub fn start(total_targets: usize) -> Self {
        Self {
            run_id: Uuid::now_v7().to_string(),
            total_targets,
            attempts: 0,
            successful: 0,
            course_attempts: BTreeMap::new(),
            successful_courses: BTreeMap::new(),
            exhausted: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            duration_secs: 0.0,
            reason: None,
        }
    }

    /// Count one attempt against a resource
    pub fn record_attempt(&mut self, resource_id: &str) {
        self.attempts += 1;
        *self.course_attempts.entry(resource_id.to_string()).or_insert(0) += 1;
    }

    /// Record an acquired resource; repeated calls are no-ops
    pub fn record_success(&mut self, resource_id: &str, name: &str) {
        if self
            .successful_courses
            .insert(resource_id.to_string(), name.to_string())
            .is_none()
        {
            self.successful += 1;
        }
    }

    /// Close the statistics with the stop reason
    pub fn finalize(&mut self, reason: CompletionReason, exhausted: Vec<String>) {
        let ended_at = Utc::now();
        self.duration_secs = (ended_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.ended_at = Some(ended_at);
        self.exhausted = exhausted;
        self.reason = Some(reason);
    }

    /// Attempts made against one resource
    pub fn attempts_for(&self, resource_id: &str) -> u32 {
        self.course_attempts.get(resource_id).copied().unwrap_or(0)
    }
}

//! Acquisition scheduler
//!
//! Drives sequential acquisition attempts over a target list with
//! per-target backoff, an attempt ceiling, an optional run deadline and
//! cooperative cancellation.

mod backoff;
mod config;
mod core;
mod stats;

pub use backoff::{BackoffController, ResourceRunState, pacing_delay};
pub use config::{MAX_BACKOFF_MULTIPLIER, MAX_PACING_DELAY, SchedulerConfig};
pub use core::Scheduler;
pub use stats::{CompletionReason, RunState, RunStatistics};

//! SeatSniper - course seat acquisition scheduler
//!
//! Repeatedly tries to enroll in a list of course sections that are full,
//! pacing attempts with per-course backoff until every seat is taken, the run
//! budget is spent, or the operator interrupts.
//!
//! # Modules
//!
//! - [`scheduler`] - Round loop, backoff and run statistics
//! - [`client`] - Acquisition client trait and the HTTP implementation
//! - [`events`] - Run event bus
//! - [`interrupt`] - Cooperative cancellation and signal handling
//! - [`report`] - Terminal status lines and summaries
//! - [`targets`] - Parsing operator-supplied target files
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//!
//! Durable targets and statuses live in the `targetstore` crate.

pub mod cli;
pub mod client;
pub mod config;
pub mod events;
pub mod interrupt;
pub mod report;
pub mod scheduler;
pub mod targets;

// Re-export commonly used types
pub use client::{AcquireError, AcquisitionClient, AttemptOutcome, HttpAcquisitionClient};
pub use config::{ClientConfig, Config, SelectionParams, StorageConfig};
pub use events::{EventBus, EventEmitter, RunEvent, create_event_bus};
pub use interrupt::{InterruptController, sleep_or_cancel};
pub use scheduler::{CompletionReason, RunState, RunStatistics, Scheduler, SchedulerConfig};
pub use targetstore::{StatusRecord, TargetResource, TargetStatus, TargetStore};

//! TargetStore - durable wish-list and status map for seat acquisition
//!
//! Holds two independent records on disk: the snapshot of resources the
//! operator wants, and the last-known status of each of them.
//!
//! # Layout
//!
//! ```text
//! {store_dir}/
//! ├── target_courses.json   # { timestamp, created_at, courses: [...] }
//! ├── course_status.json    # { resource_id: { status, message, updated_at } }
//! └── course_status.lock    # advisory lock serializing status writers
//! ```
//!
//! # Example
//!
//! ```ignore
//! use targetstore::{TargetResource, TargetStatus, TargetStore};
//!
//! let store = TargetStore::open("data")?;
//! store.save_targets(&[TargetResource::new("08305001", "Compilers", "JXB-1")])?;
//! store.update_status("08305001", TargetStatus::Failed, "section full")?;
//! ```

mod record;
mod store;

pub use record::{StatusRecord, TargetResource, TargetSnapshot, TargetStatus};
pub use store::{StatusMap, TargetStore};

/// Timestamp format used for human-readable fields in the store files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File name of the target snapshot
pub const TARGETS_FILE: &str = "target_courses.json";

/// File name of the status map
pub const STATUS_FILE: &str = "course_status.json";

/// File name of the advisory lock guarding the status map
pub const STATUS_LOCK_FILE: &str = "course_status.lock";

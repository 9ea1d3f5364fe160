//! Run events
//!
//! The scheduler publishes what it does on a broadcast [`EventBus`]; the
//! reporter in the binary subscribes and prints a status line per event.
//!
//! ```text
//!   Scheduler ──emit──▶ EventBus ──▶ reporter (stdout)
//!                          └──────▶ other subscribers (tests)
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use types::RunEvent;

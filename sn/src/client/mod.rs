//! Acquisition client abstraction
//!
//! The scheduler only sees [`AcquisitionClient`]; [`HttpAcquisitionClient`]
//! speaks to the real selection system.

#[allow(clippy::module_inception)]
pub mod client;
mod error;
mod http;
mod types;

pub use client::AcquisitionClient;
pub use error::AcquireError;
pub use http::{HttpAcquisitionClient, interpret_response};
pub use types::AttemptOutcome;

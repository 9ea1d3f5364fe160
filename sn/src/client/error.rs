//! Acquisition client error types

use std::time::Duration;
use thiserror::Error;

use super::AttemptOutcome;

/// Errors that can occur while talking to the selection system
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Session refresh failed: {0}")]
    Session(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl AcquireError {
    /// Check if retrying the attempt may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, AcquireError::Config(_))
    }

    /// Fold an error that escaped the client into a retryable outcome
    pub fn into_outcome(self) -> AttemptOutcome {
        AttemptOutcome::transient(self.to_string())
    }
}

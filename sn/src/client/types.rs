//! Attempt outcome types

use serde::{Deserialize, Serialize};
use targetstore::TargetStatus;

/// Result of one acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Seat obtained (also returned for an already-held seat)
    Acquired,

    /// Seat currently unavailable (e.g. section full)
    Rejected { reason: String },

    /// Network, timeout or session problem
    Transient { reason: String },
}

impl AttemptOutcome {
    /// Shorthand for a rejection
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected { reason: reason.into() }
    }

    /// Shorthand for a transient failure
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }

    /// Failure reason, if this is a failed attempt
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Acquired => None,
            Self::Rejected { reason } | Self::Transient { reason } => Some(reason),
        }
    }

    /// Status to persist for this outcome
    pub fn status(&self) -> TargetStatus {
        if self.is_acquired() {
            TargetStatus::Success
        } else {
            TargetStatus::Failed
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquired => write!(f, "acquired"),
            Self::Rejected { reason } => write!(f, "rejected: {}", reason),
            Self::Transient { reason } => write!(f, "transient: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status() {
        assert_eq!(AttemptOutcome::Acquired.status(), TargetStatus::Success);
        assert_eq!(AttemptOutcome::rejected("full").status(), TargetStatus::Failed);
        assert_eq!(AttemptOutcome::transient("timeout").status(), TargetStatus::Failed);
    }

    #[test]
    fn test_outcome_message_distinguishes_kind() {
        assert_eq!(AttemptOutcome::rejected("full").to_string(), "rejected: full");
        assert_eq!(AttemptOutcome::transient("timeout").to_string(), "transient: timeout");
        assert_eq!(AttemptOutcome::Acquired.reason(), None);
    }

    #[test]
    fn test_outcome_serde() {
        let json = serde_json::to_string(&AttemptOutcome::rejected("full")).unwrap();
        assert_eq!(json, r#"{"outcome":"rejected","reason":"full"}"#);

        let outcome: AttemptOutcome = serde_json::from_str(r#"{"outcome":"acquired"}"#).unwrap();
        assert!(outcome.is_acquired());
    }
}

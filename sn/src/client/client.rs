//! AcquisitionClient trait definition

use async_trait::async_trait;
use targetstore::TargetResource;

use super::{AcquireError, AttemptOutcome};

/// Performs one acquisition attempt against the external selection system
///
/// Implementations own their credentials and any term/selection context, and
/// refresh their session before each call. Attempting a resource that was
/// already acquired must return [`AttemptOutcome::Acquired`] without side
/// effects.
#[async_trait]
pub trait AcquisitionClient: Send + Sync {
    /// Try to acquire a seat in the given target's section
    async fn attempt(&self, target: &TargetResource) -> Result<AttemptOutcome, AcquireError>;
}


#[cfg(test)]
mod tests {
    use super::mock::MockAcquisitionClient;
    use super::*;

    #[tokio::test]
    async fn test_mock_plays_script_then_fallback() {
        let client = MockAcquisitionClient::always_rejected().script(
            "A",
            vec![
                Ok(AttemptOutcome::transient("timeout")),
                Err(AcquireError::InvalidResponse("html".to_string())),
            ],
        );
        let target = TargetResource::new("A", "Algebra", "S1");

        assert_eq!(
            client.attempt(&target).await.unwrap(),
            AttemptOutcome::transient("timeout")
        );
        assert!(client.attempt(&target).await.is_err());
        assert_eq!(
            client.attempt(&target).await.unwrap(),
            AttemptOutcome::rejected("section full")
        );
        assert_eq!(client.call_count("A"), 3);
    }

    #[tokio::test]
    async fn test_mock_acquired_is_idempotent() {
        let client = MockAcquisitionClient::always_rejected().script("A", vec![Ok(AttemptOutcome::Acquired)]);
        let target = TargetResource::new("A", "Algebra", "S1");

        assert!(client.attempt(&target).await.unwrap().is_acquired());
        assert!(client.attempt(&target).await.unwrap().is_acquired());
    }
}

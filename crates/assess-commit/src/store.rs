//! Persistence collaborator contract

use crate::error::CollaboratorError;
use assess_state::AssessmentSnapshot;
use async_trait::async_trait;

/// Durable sink for assessment snapshots
///
/// Called by the autosave controller for debounced, immediate and explicit
/// saves. Implementations must treat each call as a full replacement of the
/// stored assessment.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one snapshot
    async fn save(&self, snapshot: &AssessmentSnapshot) -> Result<(), CollaboratorError>;
}

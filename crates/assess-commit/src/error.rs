//! Commit and collaborator errors

use crate::state_machine::AutosaveState;

/// Failure reported by an external collaborator (persistence, file storage,
/// task creation)
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Underlying I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Collaborator refused the request
    #[error("rejected: {0}")]
    Rejected(String),

    /// Collaborator did not answer
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    /// Check if retrying later may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}

/// Commit controller error
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// State machine refused a transition
    #[error("illegal autosave transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: AutosaveState,
        /// Requested state
        to: AutosaveState,
    },

    /// Persistence failed; unsaved changes are retained
    #[error("save failed: {0}")]
    SaveFailed(#[from] CollaboratorError),
}

impl CommitError {
    /// Check if the failure came from the persistence collaborator
    #[inline]
    #[must_use]
    pub fn is_save_failure(&self) -> bool {
        matches!(self, Self::SaveFailed(_))
    }
}

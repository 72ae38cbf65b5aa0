//! Error types for the session engine
//!
//! Lower-layer errors convert upward with `#[from]`; the session adds the
//! conditions only it can detect (closed session, missing assignees, ...).

use assess_commit::{CollaboratorError, CommitError};
use assess_framework::{FrameworkError, FrameworkId};
use assess_state::{AssessmentStatus, StateError};

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Framework failed to load or validate
    #[error("framework error: {0}")]
    Framework(#[from] FrameworkError),

    /// Local state mutation rejected
    #[error(transparent)]
    State(#[from] StateError),

    /// Autosave state machine or save failure
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// File storage, task creation or persistence failed
    #[error("collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Question id not in the framework
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    /// Operation needs a current question but the framework is empty
    #[error("no active question")]
    NoActiveQuestion,

    /// Task creation attempted without assignees
    #[error("question {0} has no assignees")]
    NoAssignees(String),

    /// Mutation attempted on a completed or abandoned assessment
    #[error("assessment is {0:?} and no longer accepts changes")]
    SessionClosed(AssessmentStatus),

    /// Completion requested before every question is answered
    #[error("assessment incomplete: {answered}/{total} answered")]
    Incomplete {
        /// Answered questions
        answered: usize,
        /// Total questions
        total: usize,
    },

    /// Snapshot belongs to another framework
    #[error("snapshot is for framework {found}, expected {expected}")]
    FrameworkMismatch {
        /// Framework of the session
        expected: FrameworkId,
        /// Framework named by the snapshot
        found: FrameworkId,
    },

    /// Configuration could not be read
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Check if the error is a refused user action rather than a fault
    ///
    /// These are surfaced as warnings and never change state.
    #[inline]
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::State(_)
                | Self::NoAssignees(_)
                | Self::NoActiveQuestion
                | Self::SessionClosed(_)
                | Self::Incomplete { .. }
        )
    }

    /// Check if retrying the same call may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Collaborator(e) => e.is_retryable(),
            Self::Commit(CommitError::SaveFailed(e)) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

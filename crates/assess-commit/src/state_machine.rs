//! Autosave state machine

use crate::error::CommitError;

/// Autosave lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutosaveState {
    /// Nothing unsaved
    #[default]
    Idle,
    /// Unsaved changes, no timer armed
    Dirty,
    /// Unsaved changes, quiet-period timer armed
    Scheduled,
    /// Save in flight
    Saving,
}

impl AutosaveState {
    /// Check if there are changes not yet persisted
    #[inline]
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Validates a state transition
///
/// # Errors
/// `IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: AutosaveState, to: AutosaveState) -> Result<(), CommitError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(CommitError::IllegalTransition { from, to })
    }
}

/// States reachable in one step
#[must_use]
pub fn allowed_transitions(from: AutosaveState) -> Vec<AutosaveState> {
    use AutosaveState::{Dirty, Idle, Saving, Scheduled};
    match from {
        Idle => vec![Dirty],
        Dirty => vec![Scheduled, Saving, Idle],
        Scheduled => vec![Dirty, Saving, Idle],
        Saving => vec![Idle, Dirty],
    }
}

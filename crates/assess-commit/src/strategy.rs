//! Commit strategy trait and the two built-in policies
//!
//! Every mutation class is routed to exactly one [`CommitStrategy`]. Edits to
//! answers and annotations are debounced; assignment changes are written
//! immediately so collaborators see them without delay.

use crate::controller::AutosaveController;
use crate::error::CommitError;
use assess_state::ChangeType;
use std::time::Duration;
use tokio::time::Instant;

/// Category of state mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationClass {
    /// Answer value set or changed
    Response,
    /// Notes edited
    Notes,
    /// Confidence changed
    Confidence,
    /// Bookmark toggled
    Bookmark,
    /// Flag toggled
    Flag,
    /// Evidence linked, unlinked or uploaded
    Evidence,
    /// Assignees changed
    Assignment,
}

/// How a strategy commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPolicy {
    /// After a quiet period without further mutations
    Debounced {
        /// Quiet period
        quiet_period: Duration,
    },
    /// Right away, outside the debounce cycle
    Immediate,
}

/// Outcome of routing one mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDecision {
    /// A save is scheduled for `deadline`
    Deferred {
        /// When the save becomes due
        deadline: Instant,
    },
    /// The caller must commit now
    CommitNow {
        /// Change type to record
        change_type: ChangeType,
    },
}

impl CommitDecision {
    /// Check if the caller has to commit before returning
    #[inline]
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::CommitNow { .. })
    }
}

/// Commit strategy for a class of mutations
pub trait CommitStrategy: Send + Sync + std::fmt::Debug {
    /// React to one mutation
    ///
    /// # Errors
    /// `IllegalTransition` if the controller cannot accept the mutation
    fn on_mutation(
        &self,
        controller: &mut AutosaveController,
        now: Instant,
    ) -> Result<CommitDecision, CommitError>;

    /// Policy characteristics
    fn policy(&self) -> CommitPolicy;

    /// Change type recorded when this strategy's commit lands
    fn change_type(&self) -> ChangeType;

    /// Strategy name (for tracing)
    fn name(&self) -> &'static str;
}

/// Debounced strategy: coalesce edits into one save per quiet period
#[derive(Debug, Clone, Copy)]
pub struct DebouncedCommit {
    quiet_period: Duration,
}

impl DebouncedCommit {
    /// Create debounced strategy
    #[inline]
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period }
    }
}

impl Default for DebouncedCommit {
    fn default() -> Self {
        Self::new(crate::DEFAULT_QUIET_PERIOD)
    }
}

impl CommitStrategy for DebouncedCommit {
    fn on_mutation(
        &self,
        controller: &mut AutosaveController,
        now: Instant,
    ) -> Result<CommitDecision, CommitError> {
        let deadline = controller.mark_dirty(now)?;
        Ok(CommitDecision::Deferred { deadline })
    }

    fn policy(&self) -> CommitPolicy {
        CommitPolicy::Debounced {
            quiet_period: self.quiet_period,
        }
    }

    fn change_type(&self) -> ChangeType {
        ChangeType::ResponseModified
    }

    fn name(&self) -> &'static str {
        "Debounced"
    }
}

/// Immediate strategy: bypass the debounce timer entirely
///
/// The pending debounce cycle, if any, is left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateCommit;

impl ImmediateCommit {
    /// Create immediate strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommitStrategy for ImmediateCommit {
    fn on_mutation(
        &self,
        _controller: &mut AutosaveController,
        _now: Instant,
    ) -> Result<CommitDecision, CommitError> {
        Ok(CommitDecision::CommitNow {
            change_type: self.change_type(),
        })
    }

    fn policy(&self) -> CommitPolicy {
        CommitPolicy::Immediate
    }

    fn change_type(&self) -> ChangeType {
        ChangeType::AssignmentChanged
    }

    fn name(&self) -> &'static str {
        "Immediate"
    }
}

/// Maps mutation classes to strategies
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitRouter {
    debounced: DebouncedCommit,
    immediate: ImmediateCommit,
}

impl CommitRouter {
    /// Create router with the given quiet period
    #[inline]
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            debounced: DebouncedCommit::new(quiet_period),
            immediate: ImmediateCommit::new(),
        }
    }

    /// Quiet period of the debounced strategy
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.debounced.quiet_period
    }

    /// Strategy for a mutation class
    ///
    /// - `Assignment` → [`ImmediateCommit`]
    /// - everything else → [`DebouncedCommit`]
    #[must_use]
    pub fn strategy_for(&self, class: MutationClass) -> &dyn CommitStrategy {
        match class {
            MutationClass::Assignment => &self.immediate,
            MutationClass::Response
            | MutationClass::Notes
            | MutationClass::Confidence
            | MutationClass::Bookmark
            | MutationClass::Flag
            | MutationClass::Evidence => &self.debounced,
        }
    }

    /// Route one mutation through its strategy
    ///
    /// # Errors
    /// Propagates strategy errors
    pub fn route(
        &self,
        class: MutationClass,
        controller: &mut AutosaveController,
        now: Instant,
    ) -> Result<CommitDecision, CommitError> {
        let strategy = self.strategy_for(class);
        let decision = strategy.on_mutation(controller, now)?;
        tracing::trace!(?class, strategy = strategy.name(), ?decision, "mutation routed");
        Ok(decision)
    }
}

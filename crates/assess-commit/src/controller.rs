//! Autosave controller
//!
//! Owns the [`AutosaveState`] machine and the [`Debouncer`]. It never builds
//! snapshots itself: callers assemble one lazily between
//! [`begin_save`](AutosaveController::begin_save) and
//! [`finish_save`](AutosaveController::finish_save), so the persisted state is
//! always the latest one at expiry rather than the one at schedule time.

use crate::debounce::Debouncer;
use crate::error::{CollaboratorError, CommitError};
use crate::state_machine::{validate_transition, AutosaveState};
use crate::store::SnapshotStore;
use assess_state::AssessmentSnapshot;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Mutations persisted by this commit
    pub mutation_count: usize,
    /// Successful saves so far, including this one
    pub save_number: u64,
}

/// Debounced autosave driver
#[derive(Debug)]
pub struct AutosaveController {
    state: AutosaveState,
    debouncer: Debouncer,
    /// Mutations whose save failed, carried into the next attempt
    carried: usize,
    in_flight: usize,
    saves: u64,
    failures: u64,
}

impl AutosaveController {
    /// Create idle controller
    #[inline]
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            state: AutosaveState::Idle,
            debouncer: Debouncer::new(quiet_period),
            carried: 0,
            in_flight: 0,
            saves: 0,
            failures: 0,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> AutosaveState {
        self.state
    }

    /// Check if anything is waiting to be persisted
    #[inline]
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.state.has_unsaved_changes()
    }

    /// Quiet period
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.debouncer.quiet_period()
    }

    /// Deadline of the armed timer
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            AutosaveState::Scheduled => self.debouncer.deadline(),
            _ => None,
        }
    }

    /// Check if the armed timer has expired
    #[inline]
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.state == AutosaveState::Scheduled && self.debouncer.is_due(now)
    }

    /// Mutations not yet persisted
    #[inline]
    #[must_use]
    pub fn unsaved_mutations(&self) -> usize {
        self.carried + self.debouncer.pending()
    }

    /// Successful saves
    #[inline]
    #[must_use]
    pub fn saves(&self) -> u64 {
        self.saves
    }

    /// Failed saves
    #[inline]
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn transition(&mut self, to: AutosaveState) -> Result<(), CommitError> {
        validate_transition(self.state, to)?;
        tracing::trace!(from = ?self.state, to = ?to, "autosave transition");
        self.state = to;
        Ok(())
    }

    /// Record a debounced mutation and (re)arm the timer
    ///
    /// Returns the new deadline.
    ///
    /// # Errors
    /// `IllegalTransition` if called while a save is in flight
    pub fn mark_dirty(&mut self, now: Instant) -> Result<Instant, CommitError> {
        if self.state == AutosaveState::Saving {
            return Err(CommitError::IllegalTransition {
                from: self.state,
                to: AutosaveState::Dirty,
            });
        }
        if self.state != AutosaveState::Dirty {
            self.transition(AutosaveState::Dirty)?;
        }
        self.transition(AutosaveState::Scheduled)?;
        Ok(self.debouncer.schedule(now))
    }

    /// Enter `Saving`, flushing the timer
    ///
    /// Works from `Scheduled` (timer expiry or explicit flush) and from
    /// `Dirty` (retry after a failure). Returns the number of mutations the
    /// upcoming snapshot covers.
    ///
    /// # Errors
    /// `IllegalTransition` from `Idle` or `Saving`
    pub fn begin_save(&mut self) -> Result<usize, CommitError> {
        self.transition(AutosaveState::Saving)?;
        let flushed = self.debouncer.flush().unwrap_or(0);
        self.in_flight = self.carried + flushed;
        self.carried = 0;
        Ok(self.in_flight)
    }

    /// Leave `Saving` according to the persistence result
    ///
    /// # Errors
    /// `SaveFailed` if `result` is an error; the controller is then `Dirty`
    /// and keeps the mutation count for the retry
    pub fn finish_save(
        &mut self,
        result: Result<(), CollaboratorError>,
    ) -> Result<CommitReceipt, CommitError> {
        let count = std::mem::take(&mut self.in_flight);
        match result {
            Ok(()) => {
                self.transition(AutosaveState::Idle)?;
                self.saves += 1;
                tracing::debug!(mutations = count, save = self.saves, "autosave committed");
                Ok(CommitReceipt {
                    mutation_count: count,
                    save_number: self.saves,
                })
            }
            Err(err) => {
                self.transition(AutosaveState::Dirty)?;
                self.carried = count;
                self.failures += 1;
                tracing::warn!(error = %err, mutations = count, "autosave failed, changes retained");
                Err(CommitError::SaveFailed(err))
            }
        }
    }

    /// Account for a save made outside the debounce cycle
    ///
    /// A success clears a `Dirty` (failed, unarmed) state since the snapshot
    /// covered everything; an armed timer keeps running. A failure marks an
    /// `Idle` controller `Dirty`.
    ///
    /// # Errors
    /// `SaveFailed` if `result` is an error
    pub fn record_immediate(
        &mut self,
        result: Result<(), CollaboratorError>,
    ) -> Result<CommitReceipt, CommitError> {
        match result {
            Ok(()) => {
                let mut count = 1;
                if self.state == AutosaveState::Dirty {
                    count += std::mem::take(&mut self.carried);
                    self.transition(AutosaveState::Idle)?;
                }
                self.saves += 1;
                Ok(CommitReceipt {
                    mutation_count: count,
                    save_number: self.saves,
                })
            }
            Err(err) => {
                if self.state == AutosaveState::Idle {
                    self.transition(AutosaveState::Dirty)?;
                }
                self.carried += 1;
                self.failures += 1;
                tracing::warn!(error = %err, "immediate save failed, changes retained");
                Err(CommitError::SaveFailed(err))
            }
        }
    }

    /// Run a full debounced commit of an already-built snapshot
    ///
    /// Convenience for callers that already hold a snapshot covering every
    /// mutation marked so far. Callers that build lazily at expiry use
    /// [`begin_save`](Self::begin_save) and
    /// [`finish_save`](Self::finish_save) directly.
    ///
    /// # Errors
    /// Transition or save errors
    pub async fn commit(
        &mut self,
        store: &dyn SnapshotStore,
        snapshot: &AssessmentSnapshot,
    ) -> Result<CommitReceipt, CommitError> {
        self.begin_save()?;
        let result = store.save(snapshot).await;
        self.finish_save(result)
    }

    /// Drop pending work and return to `Idle`
    ///
    /// Returns `true` if unsaved changes were discarded.
    pub fn cancel(&mut self) -> bool {
        let had_pending = self.debouncer.cancel();
        let had_unsaved = self.state.has_unsaved_changes();
        self.carried = 0;
        if had_unsaved && self.state != AutosaveState::Saving {
            self.state = AutosaveState::Idle;
            tracing::debug!("pending autosave cancelled");
        }
        had_pending || had_unsaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_state::{
        AssessmentId, AssessmentStatus, Completion, EvidenceLibrary, ResponseStore, SessionTiming,
        SnapshotHeader,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FlakyStore {
        fail: Mutex<bool>,
        saved: Mutex<usize>,
    }

    #[async_trait]
    impl SnapshotStore for FlakyStore {
        async fn save(&self, _snapshot: &AssessmentSnapshot) -> Result<(), CollaboratorError> {
            if *self.fail.lock() {
                return Err(CollaboratorError::Unavailable("offline".into()));
            }
            *self.saved.lock() += 1;
            Ok(())
        }
    }

    fn snapshot() -> AssessmentSnapshot {
        AssessmentSnapshot::assemble(
            SnapshotHeader {
                assessment_id: AssessmentId::new(),
                framework_id: "fw".into(),
                framework_version: "1".into(),
                status: AssessmentStatus::InProgress,
            },
            &ResponseStore::new(),
            &EvidenceLibrary::new(),
            Completion::new(0, 1),
            SessionTiming::starting_now(),
            Vec::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_commit() {
        let store = FlakyStore::default();
        let mut c = AutosaveController::new(Duration::from_secs(5));

        for _ in 0..4 {
            c.mark_dirty(Instant::now()).unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert!(!c.is_due(Instant::now()));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(c.is_due(Instant::now()));

        let receipt = c.commit(&store, &snapshot()).await.unwrap();
        assert_eq!(receipt.mutation_count, 4);
        assert_eq!(*store.saved.lock(), 1);
        assert_eq!(c.state(), AutosaveState::Idle);
        assert!(!c.is_due(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_changes_for_retry() {
        let store = FlakyStore::default();
        *store.fail.lock() = true;
        let mut c = AutosaveController::new(Duration::from_secs(5));
        c.mark_dirty(Instant::now()).unwrap();
        c.mark_dirty(Instant::now()).unwrap();

        let err = c.commit(&store, &snapshot()).await.unwrap_err();
        assert!(err.is_save_failure());
        assert_eq!(c.state(), AutosaveState::Dirty);
        assert!(c.has_unsaved_changes());
        assert_eq!(c.unsaved_mutations(), 2);
        assert!(c.next_deadline().is_none());

        *store.fail.lock() = false;
        c.mark_dirty(Instant::now()).unwrap();
        assert_eq!(c.state(), AutosaveState::Scheduled);
        let receipt = c.commit(&store, &snapshot()).await.unwrap();
        assert_eq!(receipt.mutation_count, 3);
        assert_eq!(c.failures(), 1);
        assert_eq!(c.saves(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_retry_from_dirty() {
        let store = FlakyStore::default();
        *store.fail.lock() = true;
        let mut c = AutosaveController::new(Duration::from_secs(5));
        c.mark_dirty(Instant::now()).unwrap();
        assert!(c.commit(&store, &snapshot()).await.is_err());

        *store.fail.lock() = false;
        let receipt = c.commit(&store, &snapshot()).await.unwrap();
        assert_eq!(receipt.mutation_count, 1);
        assert_eq!(c.state(), AutosaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cannot_save_when_idle() {
        let store = FlakyStore::default();
        let mut c = AutosaveController::new(Duration::from_secs(5));
        assert!(matches!(
            c.commit(&store, &snapshot()).await,
            Err(CommitError::IllegalTransition { .. })
        ));
        assert_eq!(*store.saved.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_is_built_between_begin_and_finish() {
        let store = FlakyStore::default();
        let mut c = AutosaveController::new(Duration::from_secs(5));
        c.mark_dirty(Instant::now()).unwrap();
        c.mark_dirty(Instant::now()).unwrap();

        assert_eq!(c.begin_save().unwrap(), 2);
        assert_eq!(c.state(), AutosaveState::Saving);
        assert!(c.mark_dirty(Instant::now()).is_err());

        let receipt = c.finish_save(store.save(&snapshot()).await).unwrap();
        assert_eq!(receipt.mutation_count, 2);
        assert_eq!(c.state(), AutosaveState::Idle);
        assert_eq!(*store.saved.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_save_keeps_timer_armed() {
        let mut c = AutosaveController::new(Duration::from_secs(5));
        let deadline = c.mark_dirty(Instant::now()).unwrap();
        let receipt = c.record_immediate(Ok(())).unwrap();
        assert_eq!(receipt.mutation_count, 1);
        assert_eq!(c.state(), AutosaveState::Scheduled);
        assert_eq!(c.next_deadline(), Some(deadline));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_failure_marks_idle_controller_dirty() {
        let mut c = AutosaveController::new(Duration::from_secs(5));
        let err = c.record_immediate(Err(CollaboratorError::Rejected("no".into())));
        assert!(err.is_err());
        assert_eq!(c.state(), AutosaveState::Dirty);

        let receipt = c.record_immediate(Ok(())).unwrap();
        assert_eq!(receipt.mutation_count, 2);
        assert_eq!(c.state(), AutosaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_timer() {
        let mut c = AutosaveController::new(Duration::from_secs(5));
        c.mark_dirty(Instant::now()).unwrap();
        assert!(c.cancel());
        assert_eq!(c.state(), AutosaveState::Idle);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!c.is_due(Instant::now()));
        assert!(!c.cancel());
    }
}

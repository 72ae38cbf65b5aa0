//! Assessment session
//!
//! [`AssessmentSession`] is the single writer for one assessment. It owns the
//! response store, evidence library, cursor and autosave controller, and
//! reaches the outside world only through [`Collaborators`].
//!
//! # Commit paths
//!
//! | Mutation | Strategy | Change type |
//! |---|---|---|
//! | response, notes, confidence, bookmark, flag, evidence | debounced | `response_modified` |
//! | assignments | immediate | `assignment_changed` |
//! | [`save_now`](AssessmentSession::save_now) | flush | `manual_save` |
//! | complete / abandon | flush | `status_changed` |
//!
//! Snapshots are built at save time from the live state, never at schedule
//! time. A change-log entry is kept only once its snapshot is persisted.

use crate::collaborators::{Collaborators, EvidenceUpload, NotificationLevel, TaskRef};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::navigation::Cursor;
use crate::progress::{self, ProgressReport};
use assess_commit::{AutosaveController, AutosaveState, CommitDecision, CommitReceipt, CommitRouter, MutationClass};
use assess_framework::{Position, Question, QuestionId, ValidatedFramework};
use assess_state::{
    AssessmentId, AssessmentSnapshot, AssessmentStatus, ChangeLogEntry, ChangeType, Completion,
    EvidenceFilter, EvidenceId, EvidenceItem, EvidenceKind, EvidenceLibrary, EvidenceLink,
    LinkConfidence, Relevance, ResponseOutcome, ResponseStore, SessionTiming, SnapshotHeader,
    StateError, UserId,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;

/// One user's live assessment
#[derive(Debug)]
pub struct AssessmentSession {
    id: AssessmentId,
    framework: Arc<ValidatedFramework>,
    config: EngineConfig,
    collaborators: Collaborators,
    status: AssessmentStatus,
    store: ResponseStore,
    library: EvidenceLibrary,
    cursor: Cursor,
    question_entered_at: Instant,
    active_since: Instant,
    timing: SessionTiming,
    change_log: Vec<ChangeLogEntry>,
    router: CommitRouter,
    autosave: AutosaveController,
}

impl AssessmentSession {
    /// Begin a new assessment of `framework`
    #[must_use]
    pub fn new(framework: Arc<ValidatedFramework>, config: EngineConfig, collaborators: Collaborators) -> Self {
        let router = CommitRouter::new(config.quiet_period());
        let now = Instant::now();
        let session = Self {
            id: AssessmentId::new(),
            framework,
            status: AssessmentStatus::InProgress,
            store: ResponseStore::new(),
            library: EvidenceLibrary::new(),
            cursor: Cursor::new(),
            question_entered_at: now,
            active_since: now,
            timing: SessionTiming::starting_now(),
            change_log: Vec::new(),
            autosave: AutosaveController::new(router.quiet_period()),
            router,
            config,
            collaborators,
        };
        tracing::info!(
            assessment = %session.id,
            framework = %session.framework.id(),
            questions = session.framework.question_count(),
            "assessment started"
        );
        session
    }

    /// Continue an assessment from a persisted snapshot
    ///
    /// The cursor lands on the first unanswered question.
    ///
    /// # Errors
    /// `FrameworkMismatch` if the snapshot belongs to another framework
    pub fn resume(
        framework: Arc<ValidatedFramework>,
        snapshot: AssessmentSnapshot,
        config: EngineConfig,
        collaborators: Collaborators,
    ) -> EngineResult<Self> {
        if snapshot.framework_id != *framework.id() {
            return Err(EngineError::FrameworkMismatch {
                expected: framework.id().clone(),
                found: snapshot.framework_id,
            });
        }
        if snapshot.framework_version != framework.version() {
            tracing::warn!(
                saved = %snapshot.framework_version,
                current = %framework.version(),
                "resuming snapshot taken against another framework version"
            );
        }

        let store = snapshot.to_store();
        let cursor = framework
            .entries()
            .find(|(_, q)| !store.is_answered(&q.id))
            .map_or_else(Cursor::new, |(position, _)| Cursor::at(position));
        let router = CommitRouter::new(config.quiet_period());
        let now = Instant::now();

        tracing::info!(
            assessment = %snapshot.assessment_id,
            answered = store.response_count(),
            "assessment resumed"
        );
        Ok(Self {
            id: snapshot.assessment_id,
            framework,
            status: snapshot.status,
            store,
            library: snapshot.evidence_library,
            cursor,
            question_entered_at: now,
            active_since: now,
            timing: snapshot.timing,
            change_log: snapshot.change_log,
            autosave: AutosaveController::new(router.quiet_period()),
            router,
            config,
            collaborators,
        })
    }

    /// Assessment id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &AssessmentId {
        &self.id
    }

    /// Framework being assessed
    #[inline]
    #[must_use]
    pub fn framework(&self) -> &ValidatedFramework {
        &self.framework
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lifecycle status
    #[inline]
    #[must_use]
    pub fn status(&self) -> AssessmentStatus {
        self.status
    }

    /// Responses and per-question metadata
    #[inline]
    #[must_use]
    pub fn responses(&self) -> &ResponseStore {
        &self.store
    }

    /// Evidence library
    #[inline]
    #[must_use]
    pub fn library(&self) -> &EvidenceLibrary {
        &self.library
    }

    /// Committed change log
    #[inline]
    #[must_use]
    pub fn change_log(&self) -> &[ChangeLogEntry] {
        &self.change_log
    }

    // ---- navigation ----

    /// Cursor indices
    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    /// Question under the cursor, `None` for an empty framework
    #[inline]
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.cursor.current_question(&self.framework)
    }

    /// Move to the next question; no-op at the end
    pub fn advance(&mut self) -> bool {
        let moved = self.cursor.advance(&self.framework);
        if moved {
            self.question_entered_at = Instant::now();
        }
        moved
    }

    /// Move to the previous question; no-op at the start
    pub fn retreat(&mut self) -> bool {
        let moved = self.cursor.retreat(&self.framework);
        if moved {
            self.question_entered_at = Instant::now();
        }
        moved
    }

    /// Move to a question by id
    ///
    /// # Errors
    /// `UnknownQuestion`
    pub fn jump_to(&mut self, id: &QuestionId) -> EngineResult<()> {
        self.cursor.jump_to(&self.framework, id)?;
        self.question_entered_at = Instant::now();
        Ok(())
    }

    // ---- responses and metadata ----

    /// Answer the current question
    ///
    /// # Errors
    /// `NoActiveQuestion`, plus everything [`set_response`](Self::set_response) returns
    pub fn answer(&mut self, value: i32) -> EngineResult<ResponseOutcome> {
        let id = self.current_question().ok_or(EngineError::NoActiveQuestion)?.id.clone();
        self.set_response(&id, value)
    }

    /// Record an answer
    ///
    /// Time spent is captured on the first answer to the question under the
    /// cursor.
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`, `InvalidResponseValue`
    pub fn set_response(&mut self, id: &QuestionId, value: i32) -> EngineResult<ResponseOutcome> {
        self.ensure_open()?;
        let framework = Arc::clone(&self.framework);
        let question = lookup(&framework, id)?;

        let elapsed = self
            .current_question()
            .is_some_and(|current| current.id == *id)
            .then(|| Instant::now().saturating_duration_since(self.question_entered_at));

        let outcome = self.store.set_response(question, value, elapsed)?;
        self.record_mutation(MutationClass::Response)?;
        Ok(outcome)
    }

    /// Replace a question's notes; blank text clears them
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`
    pub fn set_notes(&mut self, id: &QuestionId, notes: impl Into<String>) -> EngineResult<()> {
        self.ensure_known_and_open(id)?;
        self.store.set_notes(id, notes);
        self.record_mutation(MutationClass::Notes)?;
        Ok(())
    }

    /// Set answer confidence (1..=5)
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`, `InvalidConfidence`
    pub fn set_confidence(&mut self, id: &QuestionId, level: u8) -> EngineResult<()> {
        self.ensure_known_and_open(id)?;
        self.store.set_confidence(id, level)?;
        self.record_mutation(MutationClass::Confidence)?;
        Ok(())
    }

    /// Toggle the bookmark, returning the new value
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`
    pub fn toggle_bookmark(&mut self, id: &QuestionId) -> EngineResult<bool> {
        self.ensure_known_and_open(id)?;
        let on = self.store.toggle_bookmark(id);
        self.record_mutation(MutationClass::Bookmark)?;
        Ok(on)
    }

    /// Toggle the review flag, returning the new value
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`
    pub fn toggle_flag(&mut self, id: &QuestionId) -> EngineResult<bool> {
        self.ensure_known_and_open(id)?;
        let on = self.store.toggle_flag(id);
        self.record_mutation(MutationClass::Flag)?;
        Ok(on)
    }

    /// Replace a question's assignees and persist immediately
    ///
    /// Returns `false` (and saves nothing) when the list is unchanged. A
    /// pending debounced save stays scheduled.
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`, or the save failure (also notified)
    pub async fn set_assignments(&mut self, id: &QuestionId, users: Vec<UserId>) -> EngineResult<bool> {
        self.ensure_known_and_open(id)?;
        if !self.store.set_assignments(id, users) {
            return Ok(false);
        }
        let count = self.store.assignments(id).len();
        if let CommitDecision::CommitNow { change_type } = self.record_mutation(MutationClass::Assignment)? {
            self.commit_immediate(change_type, format!("{id} assigned to {count} user(s)"))
                .await?;
        }
        Ok(true)
    }

    /// Create an external task for a question's assignees
    ///
    /// # Errors
    /// `NoAssignees` (notified as a warning), or the collaborator failure
    /// (notified as an error)
    pub async fn create_task(&mut self, id: &QuestionId) -> EngineResult<TaskRef> {
        self.ensure_known_and_open(id)?;
        let assignees = self.store.assignments(id).to_vec();
        if assignees.is_empty() {
            self.notify(NotificationLevel::Warning, &format!("Assign someone to {id} before creating a task"));
            return Err(EngineError::NoAssignees(id.to_string()));
        }

        let tasks = Arc::clone(&self.collaborators.tasks);
        match tasks.create_task(id, &assignees).await {
            Ok(task) => {
                tracing::info!(question = %id, task = %task.id, "task created");
                self.notify(NotificationLevel::Success, &format!("Task {} created", task.id));
                Ok(task)
            }
            Err(e) => {
                tracing::error!(question = %id, error = %e, "task creation failed");
                self.notify(NotificationLevel::Error, &format!("Could not create task: {e}"));
                Err(e.into())
            }
        }
    }

    /// Wipe responses and metadata and start over
    ///
    /// The evidence library and change log are kept. Any pending autosave is
    /// cancelled.
    ///
    /// # Errors
    /// `SessionClosed`
    pub fn reset(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        let discarded = self.autosave.cancel();
        self.store.clear();
        self.cursor.rewind();
        self.question_entered_at = Instant::now();
        tracing::info!(assessment = %self.id, discarded, "assessment reset");
        Ok(())
    }

    // ---- evidence ----

    /// Link a library item to a question
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`, `UnknownEvidence`, `DuplicateLink`
    pub fn link_evidence(
        &mut self,
        id: &QuestionId,
        evidence: &EvidenceId,
        relevance: Relevance,
        confidence: LinkConfidence,
    ) -> EngineResult<()> {
        self.ensure_known_and_open(id)?;
        if !self.library.contains(evidence) {
            return Err(StateError::UnknownEvidence(evidence.to_string()).into());
        }
        let link = EvidenceLink::new(evidence.clone(), relevance, confidence, self.config.user.clone());
        self.store.link_evidence(id, link)?;
        self.record_mutation(MutationClass::Evidence)?;
        Ok(())
    }

    /// Remove a link; absent links are a silent no-op
    ///
    /// # Errors
    /// `SessionClosed`, `UnknownQuestion`
    pub fn unlink_evidence(&mut self, id: &QuestionId, evidence: &EvidenceId) -> EngineResult<bool> {
        self.ensure_known_and_open(id)?;
        let removed = self.store.unlink_evidence(id, evidence);
        if removed {
            self.record_mutation(MutationClass::Evidence)?;
        }
        Ok(removed)
    }

    /// Upload a file and link it to the current question
    ///
    /// Content already in the library is linked again rather than duplicated.
    /// If the current question already links it, nothing changes and a
    /// warning is notified.
    ///
    /// # Errors
    /// `SessionClosed`, `NoActiveQuestion`, or the upload failure (notified;
    /// library and links untouched)
    pub async fn upload_and_link(&mut self, upload: EvidenceUpload) -> EngineResult<EvidenceId> {
        self.ensure_open()?;
        let question = self.current_question().ok_or(EngineError::NoActiveQuestion)?.id.clone();
        let tags = upload.tags.clone();
        let name = upload.name.clone();

        let files = Arc::clone(&self.collaborators.files);
        let stored = match files.upload(upload).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(file = %name, error = %e, "evidence upload failed");
                self.notify(NotificationLevel::Error, &format!("Upload of {name} failed: {e}"));
                return Err(e.into());
            }
        };

        if !self.library.contains(&stored.id) {
            let mut item = EvidenceItem::new(stored.id.clone(), stored.name, EvidenceKind::from_mime(&stored.mime_type))
                .with_tags(tags);
            item.uploaded_at = stored.uploaded_at;
            item.url = stored.url;
            item.size_bytes = stored.size;
            item.mime_type = stored.mime_type;
            self.library.add(item)?;
        }

        let already_linked = self
            .store
            .links_for(&question)
            .iter()
            .any(|link| link.evidence_id == stored.id);
        if already_linked {
            tracing::info!(question = %question, evidence = %stored.id, "evidence already linked");
            self.notify(NotificationLevel::Warning, &format!("{name} is already linked to {question}"));
            return Ok(stored.id);
        }

        let defaults = self.config.evidence;
        self.link_evidence(&question, &stored.id, defaults.default_relevance, defaults.default_confidence)?;
        tracing::info!(question = %question, evidence = %stored.id, "evidence uploaded and linked");
        self.notify(NotificationLevel::Success, &format!("{name} linked to {question}"));
        Ok(stored.id)
    }

    /// Library items matching `filter`
    #[must_use]
    pub fn evidence_candidates(&self, filter: &EvidenceFilter) -> Vec<&EvidenceItem> {
        self.library.filter(filter, &self.store)
    }

    // ---- progress ----

    /// Answered/total over the framework
    #[must_use]
    pub fn completion(&self) -> Completion {
        progress::completion(&self.framework, &self.store)
    }

    /// Full progress report
    #[must_use]
    pub fn progress(&self) -> ProgressReport {
        progress::calculate(&self.framework, &self.store)
    }

    /// Bookmarked questions in traversal order
    #[must_use]
    pub fn bookmarked(&self) -> Vec<&QuestionId> {
        self.questions_where(|store, id| store.meta(id).is_some_and(|m| m.bookmarked))
    }

    /// Flagged questions in traversal order
    #[must_use]
    pub fn flagged(&self) -> Vec<&QuestionId> {
        self.questions_where(|store, id| store.meta(id).is_some_and(|m| m.flagged))
    }

    /// Unanswered questions in traversal order
    #[must_use]
    pub fn unanswered(&self) -> Vec<&QuestionId> {
        self.questions_where(|store, id| !store.is_answered(id))
    }

    fn questions_where(&self, keep: impl Fn(&ResponseStore, &QuestionId) -> bool) -> Vec<&QuestionId> {
        self.framework
            .entries()
            .map(|(_, q)| &q.id)
            .filter(|id| keep(&self.store, id))
            .collect()
    }

    // ---- autosave ----

    /// Autosave state
    #[inline]
    #[must_use]
    pub fn autosave_state(&self) -> AutosaveState {
        self.autosave.state()
    }

    /// Check if edits are waiting to be persisted
    #[inline]
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.has_unsaved_changes()
    }

    /// When the armed autosave becomes due
    #[inline]
    #[must_use]
    pub fn next_autosave_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    /// Commit if the quiet period has elapsed
    ///
    /// # Errors
    /// The save failure (also notified); changes stay unsaved
    pub async fn poll_autosave(&mut self) -> EngineResult<Option<CommitReceipt>> {
        if !self.autosave.is_due(Instant::now()) {
            return Ok(None);
        }
        self.commit_pending(ChangeType::ResponseModified, None).await.map(Some)
    }

    /// Sleep until the armed deadline, then commit
    ///
    /// Returns immediately with `None` if nothing is scheduled.
    ///
    /// # Errors
    /// See [`poll_autosave`](Self::poll_autosave)
    pub async fn autosave_when_due(&mut self) -> EngineResult<Option<CommitReceipt>> {
        let Some(deadline) = self.autosave.next_deadline() else {
            return Ok(None);
        };
        tokio::time::sleep_until(deadline).await;
        self.poll_autosave().await
    }

    /// Persist now, flushing any pending autosave
    ///
    /// # Errors
    /// The save failure (also notified)
    pub async fn save_now(&mut self) -> EngineResult<CommitReceipt> {
        let receipt = self
            .commit_now(ChangeType::ManualSave, "manual save".to_string())
            .await?;
        self.notify(NotificationLevel::Success, "Assessment saved");
        Ok(receipt)
    }

    // ---- lifecycle ----

    /// Close the assessment as completed
    ///
    /// # Errors
    /// `SessionClosed`, `Incomplete`, or the save failure (status reverts)
    pub async fn mark_complete(&mut self) -> EngineResult<CommitReceipt> {
        self.ensure_open()?;
        let completion = self.completion();
        if !completion.is_complete() {
            return Err(EngineError::Incomplete {
                answered: completion.answered,
                total: completion.total,
            });
        }
        self.change_status(AssessmentStatus::Completed).await
    }

    /// Close the assessment without completing it
    ///
    /// # Errors
    /// `SessionClosed`, or the save failure (status reverts)
    pub async fn abandon(&mut self) -> EngineResult<CommitReceipt> {
        self.ensure_open()?;
        self.change_status(AssessmentStatus::Abandoned).await
    }

    /// End the session, cancelling any pending autosave
    ///
    /// Returns `true` if unsaved changes were discarded.
    pub fn close(mut self) -> bool {
        let discarded = self.autosave.cancel();
        if discarded {
            tracing::warn!(assessment = %self.id, "session closed with unsaved changes");
        } else {
            tracing::info!(assessment = %self.id, "session closed");
        }
        discarded
    }

    /// Current state as a snapshot, without a new change-log entry
    #[must_use]
    pub fn snapshot(&self) -> AssessmentSnapshot {
        self.build_snapshot(None)
    }

    // ---- internals ----

    fn ensure_open(&self) -> EngineResult<()> {
        if self.status.is_closed() {
            tracing::warn!(assessment = %self.id, status = ?self.status, "mutation refused");
            return Err(EngineError::SessionClosed(self.status));
        }
        Ok(())
    }

    fn ensure_known_and_open(&self, id: &QuestionId) -> EngineResult<()> {
        self.ensure_open()?;
        lookup(&self.framework, id).map(|_| ())
    }

    fn record_mutation(&mut self, class: MutationClass) -> EngineResult<CommitDecision> {
        Ok(self.router.route(class, &mut self.autosave, Instant::now())?)
    }

    fn notify(&self, level: NotificationLevel, message: &str) {
        self.collaborators.notifier.notify(level, message);
    }

    fn timing_now(&self) -> SessionTiming {
        let mut timing = self.timing.clone();
        timing.active_seconds += self.active_since.elapsed().as_secs();
        timing
    }

    fn build_snapshot(&self, entry: Option<ChangeLogEntry>) -> AssessmentSnapshot {
        let mut change_log = self.change_log.clone();
        let saving = entry.is_some();
        change_log.extend(entry);

        let mut timing = self.timing_now();
        if saving {
            timing.last_saved_at = Some(Utc::now());
        }

        AssessmentSnapshot::assemble(
            SnapshotHeader {
                assessment_id: self.id,
                framework_id: self.framework.id().clone(),
                framework_version: self.framework.version().to_string(),
                status: self.status,
            },
            &self.store,
            &self.library,
            self.completion(),
            timing,
            change_log,
        )
    }

    async fn change_status(&mut self, status: AssessmentStatus) -> EngineResult<CommitReceipt> {
        let previous = std::mem::replace(&mut self.status, status);
        match self.commit_now(ChangeType::StatusChanged, format!("{previous:?} -> {status:?}")).await {
            Ok(receipt) => {
                tracing::info!(assessment = %self.id, ?status, "assessment closed");
                Ok(receipt)
            }
            Err(e) => {
                self.status = previous;
                Err(e)
            }
        }
    }

    /// Flush pending edits if any, otherwise write a standalone snapshot
    async fn commit_now(&mut self, change_type: ChangeType, description: String) -> EngineResult<CommitReceipt> {
        if self.autosave.has_unsaved_changes() {
            self.commit_pending(change_type, Some(description)).await
        } else {
            self.commit_immediate(change_type, description).await
        }
    }

    async fn commit_pending(
        &mut self,
        change_type: ChangeType,
        description: Option<String>,
    ) -> EngineResult<CommitReceipt> {
        let mutations = self.autosave.begin_save()?;
        let description = description.unwrap_or_else(|| format!("{mutations} change(s) saved"));
        let entry = ChangeLogEntry::new(change_type, description).with_mutation_count(mutations);
        let snapshot = self.build_snapshot(Some(entry.clone()));

        let store = Arc::clone(&self.collaborators.store);
        let result = store.save(&snapshot).await;
        match self.autosave.finish_save(result) {
            Ok(receipt) => {
                self.on_saved(entry, &snapshot);
                if change_type == ChangeType::ResponseModified && self.config.autosave.notify_on_success {
                    self.notify(NotificationLevel::Success, "Changes saved");
                }
                Ok(receipt)
            }
            Err(e) => {
                self.notify(NotificationLevel::Error, &format!("Save failed, changes kept: {e}"));
                Err(e.into())
            }
        }
    }

    async fn commit_immediate(&mut self, change_type: ChangeType, description: String) -> EngineResult<CommitReceipt> {
        let entry = ChangeLogEntry::new(change_type, description).with_mutation_count(1);
        let snapshot = self.build_snapshot(Some(entry.clone()));

        let store = Arc::clone(&self.collaborators.store);
        let result = store.save(&snapshot).await;
        match self.autosave.record_immediate(result) {
            Ok(receipt) => {
                self.on_saved(entry, &snapshot);
                Ok(receipt)
            }
            Err(e) => {
                self.notify(NotificationLevel::Error, &format!("Save failed, changes kept: {e}"));
                Err(e.into())
            }
        }
    }

    fn on_saved(&mut self, entry: ChangeLogEntry, snapshot: &AssessmentSnapshot) {
        tracing::info!(
            assessment = %self.id,
            change = ?entry.change_type,
            mutations = entry.mutation_count,
            progress = snapshot.progress_percentage,
            "snapshot committed"
        );
        self.change_log.push(entry);
        self.timing.last_saved_at = snapshot.timing.last_saved_at;
    }
}

fn lookup<'a>(framework: &'a ValidatedFramework, id: &QuestionId) -> EngineResult<&'a Question> {
    framework
        .question(id)
        .map(|entry| entry.question)
        .ok_or_else(|| EngineError::UnknownQuestion(id.to_string()))
}

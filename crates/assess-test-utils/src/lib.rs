//! Testing utilities for the assess workspace
//!
//! Framework fixtures and recording fakes for every collaborator.

#![allow(missing_docs)]

use assess_commit::{CollaboratorError, SnapshotStore};
use assess_core::{
    AssessmentSession, Collaborators, EngineConfig, EvidenceUpload, FileStorage, NotificationLevel,
    NotificationSink, StoredFile, TaskCreator, TaskRef,
};
use assess_framework::{Category, Framework, Priority, Question, QuestionId, Section, ValidatedFramework};
use assess_state::{AssessmentSnapshot, EvidenceId, UserId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

// ---- fixtures ----

/// Question with options 0..=4
pub fn scored_question(id: &str) -> Question {
    (0..=4).fold(Question::new(id, format!("Question {id}")), |q, v| {
        q.with_option(v, format!("level {v}"))
    })
}

/// 2 sections × 1 category × 2 questions: q1 q2 | q3 q4
///
/// q1 and q3 are high priority; section s1 weighs twice as much as s2.
pub fn two_by_two_framework() -> Arc<ValidatedFramework> {
    let framework = Framework::new("two-by-two", "1.0")
        .with_name("Two by two")
        .with_section(
            Section::new("s1", "Governance").with_weight(2.0).with_category(
                Category::new("c1", "Policy")
                    .with_question(scored_question("q1").with_priority(Priority::High))
                    .with_question(scored_question("q2")),
            ),
        )
        .with_section(
            Section::new("s2", "Operations").with_category(
                Category::new("c2", "Monitoring")
                    .with_question(scored_question("q3").with_priority(Priority::High))
                    .with_question(scored_question("q4")),
            ),
        );
    Arc::new(framework.validate().unwrap())
}

/// Framework where section `i` has `shape[i]` categories and each category
/// of section `i` has `questions` questions
pub fn shaped_framework(shape: &[usize], questions: usize) -> Arc<ValidatedFramework> {
    let mut framework = Framework::new("shaped", "1.0");
    let mut n = 0;
    for (s, categories) in shape.iter().enumerate() {
        let mut section = Section::new(format!("s{s}"), format!("Section {s}"));
        for c in 0..*categories {
            let mut category = Category::new(format!("s{s}c{c}"), "");
            for _ in 0..questions {
                n += 1;
                category = category.with_question(scored_question(&format!("q{n}")));
            }
            section = section.with_category(category);
        }
        framework = framework.with_section(section);
    }
    Arc::new(framework.validate().unwrap())
}

pub fn qid(id: &str) -> QuestionId {
    QuestionId::new(id)
}

// ---- fakes ----

/// Snapshot store that records every save; can be switched to fail
#[derive(Debug, Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<AssessmentSnapshot>>,
    failing: Mutex<bool>,
    attempts: Mutex<usize>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn saved(&self) -> Vec<AssessmentSnapshot> {
        self.saved.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }

    pub fn last(&self) -> Option<AssessmentSnapshot> {
        self.saved.lock().last().cloned()
    }
}

#[async_trait]
impl SnapshotStore for RecordingStore {
    async fn save(&self, snapshot: &AssessmentSnapshot) -> Result<(), CollaboratorError> {
        *self.attempts.lock() += 1;
        if *self.failing.lock() {
            return Err(CollaboratorError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk unavailable",
            )));
        }
        self.saved.lock().push(snapshot.clone());
        Ok(())
    }
}

/// Notifier that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(NotificationLevel, String)> {
        self.events.lock().clone()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.events.lock().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn last(&self) -> Option<(NotificationLevel, String)> {
        self.events.lock().last().cloned()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.events.lock().push((level, message.to_string()));
    }
}

/// File storage that keeps uploads in memory and numbers them `ev-1`, `ev-2`, ...
#[derive(Debug, Default)]
pub struct InMemoryFileStorage {
    files: Mutex<Vec<(StoredFile, Vec<u8>)>>,
    failing: Mutex<bool>,
}

impl InMemoryFileStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn upload_count(&self) -> usize {
        self.files.lock().len()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn upload(&self, file: EvidenceUpload) -> Result<StoredFile, CollaboratorError> {
        if *self.failing.lock() {
            return Err(CollaboratorError::Unavailable("storage offline".into()));
        }
        let mut files = self.files.lock();
        let id = EvidenceId::new(format!("ev-{}", files.len() + 1));
        let stored = StoredFile {
            url: format!("mem://{id}"),
            id,
            name: file.name,
            size: file.bytes.len() as u64,
            mime_type: file.mime_type,
            uploaded_at: Utc::now(),
        };
        files.push((stored.clone(), file.bytes));
        Ok(stored)
    }
}

/// Task creator that records its calls
#[derive(Debug, Default)]
pub struct RecordingTaskCreator {
    calls: Mutex<Vec<(QuestionId, Vec<UserId>)>>,
    failing: Mutex<bool>,
}

impl RecordingTaskCreator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn calls(&self) -> Vec<(QuestionId, Vec<UserId>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TaskCreator for RecordingTaskCreator {
    async fn create_task(&self, question: &QuestionId, assignees: &[UserId]) -> Result<TaskRef, CollaboratorError> {
        let mut calls = self.calls.lock();
        calls.push((question.clone(), assignees.to_vec()));
        if *self.failing.lock() {
            return Err(CollaboratorError::Unavailable("tracker down".into()));
        }
        Ok(TaskRef {
            id: format!("TASK-{}", calls.len()),
            question: question.clone(),
        })
    }
}

/// All fakes, wired together
#[derive(Debug, Clone)]
pub struct Fakes {
    pub store: Arc<RecordingStore>,
    pub files: Arc<InMemoryFileStorage>,
    pub tasks: Arc<RecordingTaskCreator>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            store: RecordingStore::new(),
            files: InMemoryFileStorage::new(),
            tasks: RecordingTaskCreator::new(),
            notifier: RecordingNotifier::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.store.clone(),
            self.files.clone(),
            self.tasks.clone(),
            self.notifier.clone(),
        )
    }

    /// Fresh session with default configuration
    pub fn session(&self, framework: Arc<ValidatedFramework>) -> AssessmentSession {
        AssessmentSession::new(framework, EngineConfig::new().with_user("tester"), self.collaborators())
    }
}

impl Default for Fakes {
    fn default() -> Self {
        Self::new()
    }
}

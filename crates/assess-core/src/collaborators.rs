//! External collaborator contracts
//!
//! The engine owns none of these services. Persistence is
//! [`SnapshotStore`](assess_commit::SnapshotStore); the rest live here.

use assess_commit::{CollaboratorError, SnapshotStore};
use assess_framework::QuestionId;
use assess_state::{EvidenceId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// File handed to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceUpload {
    /// Original file name
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// Tags copied onto the evidence item
    pub tags: Vec<String>,
}

impl EvidenceUpload {
    /// Create upload
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
            tags: Vec::new(),
        }
    }

    /// With tags
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Descriptor returned by file storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Storage-issued id, reused as the evidence id
    pub id: EvidenceId,
    /// Stored name
    pub name: String,
    /// Retrieval location
    pub url: String,
    /// Byte size
    pub size: u64,
    /// MIME type
    pub mime_type: String,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

/// Byte storage for evidence files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store one file
    async fn upload(&self, file: EvidenceUpload) -> Result<StoredFile, CollaboratorError>;
}

/// Reference to an externally created task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    /// External task id
    pub id: String,
    /// Question the task covers
    pub question: QuestionId,
}

/// Task tracker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskCreator: Send + Sync {
    /// Create a task for `question` owned by `assignees`
    async fn create_task(
        &self,
        question: &QuestionId,
        assignees: &[UserId],
    ) -> Result<TaskRef, CollaboratorError>;
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
    /// Operation refused
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(s)
    }
}

/// Fire-and-forget user notifications
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification
    fn notify(&self, level: NotificationLevel, message: &str);
}

/// Every collaborator a session talks to
#[derive(Clone)]
pub struct Collaborators {
    /// Snapshot persistence
    pub store: Arc<dyn SnapshotStore>,
    /// Evidence byte storage
    pub files: Arc<dyn FileStorage>,
    /// Task tracker
    pub tasks: Arc<dyn TaskCreator>,
    /// Notification sink
    pub notifier: Arc<dyn NotificationSink>,
}

impl Collaborators {
    /// Bundle collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        files: Arc<dyn FileStorage>,
        tasks: Arc<dyn TaskCreator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            files,
            tasks,
            notifier,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

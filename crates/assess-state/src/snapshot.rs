//! Persisted assessment snapshot and change log
//!
//! A snapshot merges the response store, every question's metadata, the
//! evidence library, session timing and the change log into one record. The
//! completion counters are derived at assembly time and must agree with each
//! other; see [`AssessmentSnapshot::is_consistent`].

use crate::evidence::EvidenceLibrary;
use crate::ids::{AssessmentId, ChangeId};
use crate::meta::QuestionMeta;
use crate::response::{ResponseRecord, ResponseStore};
use assess_framework::{FrameworkId, QuestionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Accepting edits
    #[default]
    InProgress,
    /// Marked complete by the user
    Completed,
    /// Closed without completion
    Abandoned,
}

impl AssessmentStatus {
    /// Check if the assessment no longer accepts edits
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Kind of change a commit recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Debounced batch of response/metadata/evidence edits
    ResponseModified,
    /// Assignment update, written immediately
    AssignmentChanged,
    /// User-requested save
    ManualSave,
    /// Completed or abandoned
    StatusChanged,
}

impl ChangeType {
    /// Impact recorded for this change type
    #[inline]
    #[must_use]
    pub fn default_impact(self) -> ChangeImpact {
        match self {
            Self::ResponseModified | Self::ManualSave => ChangeImpact::Medium,
            Self::AssignmentChanged => ChangeImpact::Low,
            Self::StatusChanged => ChangeImpact::High,
        }
    }
}

/// Audit impact classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeImpact {
    /// Cosmetic or collaborative
    Low,
    /// Content edits
    Medium,
    /// Lifecycle changes
    High,
}

/// Audit record appended on every committed save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Entry id
    pub id: ChangeId,
    /// Commit time
    pub timestamp: DateTime<Utc>,
    /// What kind of change was committed
    pub change_type: ChangeType,
    /// How significant it is
    pub impact: ChangeImpact,
    /// Whether the change may be rolled back
    pub rollbackable: bool,
    /// Human-readable summary
    #[serde(default)]
    pub description: String,
    /// Mutations coalesced into this commit
    #[serde(default)]
    pub mutation_count: usize,
}

impl ChangeLogEntry {
    /// Create entry with the type's default impact
    #[must_use]
    pub fn new(change_type: ChangeType, description: impl Into<String>) -> Self {
        Self {
            id: ChangeId::new(),
            timestamp: Utc::now(),
            change_type,
            impact: change_type.default_impact(),
            rollbackable: !matches!(change_type, ChangeType::StatusChanged),
            description: description.into(),
            mutation_count: 0,
        }
    }

    /// With coalesced mutation count
    #[inline]
    #[must_use]
    pub fn with_mutation_count(mut self, count: usize) -> Self {
        self.mutation_count = count;
        self
    }
}

/// Answered/total pair with derived completion figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Completion {
    /// Answered questions
    pub answered: usize,
    /// Total questions
    pub total: usize,
}

impl Completion {
    /// Create completion pair
    #[inline]
    #[must_use]
    pub const fn new(answered: usize, total: usize) -> Self {
        Self { answered, total }
    }

    /// `round(100 * answered / total)`, 0 when `total == 0`
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let answered = self.answered.min(self.total);
        // round half up in integer arithmetic
        let pct = (200 * answered + self.total) / (2 * self.total);
        u8::try_from(pct).unwrap_or(100)
    }

    /// `answered == total`
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answered == self.total
    }
}

/// Session timing carried in every snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTiming {
    /// When the assessment began
    pub started_at: DateTime<Utc>,
    /// Accumulated active time across sessions
    pub active_seconds: u64,
    /// Last successful save
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl SessionTiming {
    /// Timing for an assessment starting now
    #[must_use]
    pub fn starting_now() -> Self {
        Self {
            started_at: Utc::now(),
            active_seconds: 0,
            last_saved_at: None,
        }
    }
}

/// Identity fields of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Assessment id
    pub assessment_id: AssessmentId,
    /// Framework id
    pub framework_id: FrameworkId,
    /// Framework version
    pub framework_version: String,
    /// Lifecycle status
    pub status: AssessmentStatus,
}

/// One persisted, internally-consistent copy of an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    /// Assessment id
    pub assessment_id: AssessmentId,
    /// Framework id
    pub framework_id: FrameworkId,
    /// Framework version
    pub framework_version: String,
    /// Lifecycle status
    pub status: AssessmentStatus,
    /// Answers
    pub responses: BTreeMap<QuestionId, ResponseRecord>,
    /// Non-empty per-question annotations
    pub question_meta: BTreeMap<QuestionId, QuestionMeta>,
    /// Evidence library
    pub evidence_library: EvidenceLibrary,
    /// Session timing
    pub timing: SessionTiming,
    /// Answered questions
    pub answered_count: usize,
    /// Total questions
    pub total_count: usize,
    /// Rounded completion percentage
    pub progress_percentage: u8,
    /// Cached `answered_count == total_count`
    pub is_complete: bool,
    /// Append-only audit trail
    pub change_log: Vec<ChangeLogEntry>,
    /// Assembly time
    pub saved_at: DateTime<Utc>,
}

impl AssessmentSnapshot {
    /// Merge all sub-records into one snapshot
    ///
    /// Derived counters are computed from `completion` here and nowhere else.
    #[must_use]
    pub fn assemble(
        header: SnapshotHeader,
        store: &ResponseStore,
        library: &EvidenceLibrary,
        completion: Completion,
        timing: SessionTiming,
        change_log: Vec<ChangeLogEntry>,
    ) -> Self {
        Self {
            assessment_id: header.assessment_id,
            framework_id: header.framework_id,
            framework_version: header.framework_version,
            status: header.status,
            responses: store.responses().clone(),
            question_meta: store.meta_map(),
            evidence_library: library.clone(),
            timing,
            answered_count: completion.answered,
            total_count: completion.total,
            progress_percentage: completion.percentage(),
            is_complete: completion.is_complete(),
            change_log,
            saved_at: Utc::now(),
        }
    }

    /// Check the cached completion fields against each other
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let completion = Completion::new(self.answered_count, self.total_count);
        self.is_complete == completion.is_complete()
            && self.progress_percentage == completion.percentage()
            && self.answered_count <= self.total_count
    }

    /// Most recent change-log entry
    #[inline]
    #[must_use]
    pub fn latest_change(&self) -> Option<&ChangeLogEntry> {
        self.change_log.last()
    }

    /// Rebuild the response store held in this snapshot
    #[must_use]
    pub fn to_store(&self) -> ResponseStore {
        ResponseStore::from_parts(self.responses.clone(), self.question_meta.clone())
    }
}

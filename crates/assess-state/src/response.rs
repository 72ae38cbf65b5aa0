//! Response store
//!
//! Maps question ids to answers and to their [`QuestionMeta`]. Answers are
//! validated against the question's declared options; everything else is an
//! unconditional overwrite.

use crate::error::StateError;
use crate::evidence::EvidenceLink;
use crate::ids::{EvidenceId, UserId};
use crate::meta::{Confidence, QuestionMeta};
use assess_framework::{Question, QuestionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A recorded answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Selected option value
    pub value: i32,
    /// Time of the latest write
    pub answered_at: DateTime<Utc>,
}

/// What a successful `set_response` changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseOutcome {
    /// Value before this call, `None` on first answer
    pub previous: Option<i32>,
    /// Whether time spent was recorded by this call
    pub time_recorded: bool,
}

impl ResponseOutcome {
    /// First answer to the question
    #[inline]
    #[must_use]
    pub fn is_first_answer(&self) -> bool {
        self.previous.is_none()
    }
}

/// Answers and annotations for one assessment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseStore {
    responses: BTreeMap<QuestionId, ResponseRecord>,
    meta: BTreeMap<QuestionId, QuestionMeta>,
}

impl ResponseStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted maps
    #[must_use]
    pub fn from_parts(
        responses: BTreeMap<QuestionId, ResponseRecord>,
        meta: BTreeMap<QuestionId, QuestionMeta>,
    ) -> Self {
        Self { responses, meta }
    }

    /// Record an answer
    ///
    /// On the first answer, `elapsed` (time on the question so far) is stored
    /// as time spent unless a value already exists.
    ///
    /// # Errors
    /// `InvalidResponseValue` if `value` is not a declared option; the store
    /// is left untouched
    pub fn set_response(
        &mut self,
        question: &Question,
        value: i32,
        elapsed: Option<Duration>,
    ) -> Result<ResponseOutcome, StateError> {
        if !question.accepts(value) {
            return Err(StateError::InvalidResponseValue {
                question: question.id.to_string(),
                value,
            });
        }

        let previous = self
            .responses
            .insert(
                question.id.clone(),
                ResponseRecord {
                    value,
                    answered_at: Utc::now(),
                },
            )
            .map(|r| r.value);

        let time_recorded = match (previous, elapsed) {
            (None, Some(elapsed)) => self.record_time_spent(&question.id, elapsed),
            _ => false,
        };

        tracing::debug!(question = %question.id, value, ?previous, "response recorded");
        Ok(ResponseOutcome {
            previous,
            time_recorded,
        })
    }

    /// Recorded answer, `None` if unanswered
    #[inline]
    #[must_use]
    pub fn get_response(&self, id: &QuestionId) -> Option<&ResponseRecord> {
        self.responses.get(id)
    }

    /// Recorded answer value
    #[inline]
    #[must_use]
    pub fn value(&self, id: &QuestionId) -> Option<i32> {
        self.responses.get(id).map(|r| r.value)
    }

    /// Check if a question has an answer
    #[inline]
    #[must_use]
    pub fn is_answered(&self, id: &QuestionId) -> bool {
        self.responses.contains_key(id)
    }

    /// Number of stored answers
    #[inline]
    #[must_use]
    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    /// All answers
    #[inline]
    #[must_use]
    pub fn responses(&self) -> &BTreeMap<QuestionId, ResponseRecord> {
        &self.responses
    }

    /// Annotations, `None` if never touched
    #[inline]
    #[must_use]
    pub fn meta(&self, id: &QuestionId) -> Option<&QuestionMeta> {
        self.meta.get(id)
    }

    /// All non-empty annotations
    #[must_use]
    pub fn meta_map(&self) -> BTreeMap<QuestionId, QuestionMeta> {
        self.meta
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(id, m)| (id.clone(), m.clone()))
            .collect()
    }

    fn meta_mut(&mut self, id: &QuestionId) -> &mut QuestionMeta {
        self.meta.entry(id.clone()).or_default()
    }

    /// Store time spent unless one is already stored
    ///
    /// Returns `true` if written.
    pub fn record_time_spent(&mut self, id: &QuestionId, elapsed: Duration) -> bool {
        self.meta_mut(id).record_time_spent(elapsed)
    }

    /// Replace notes; blank text clears them
    pub fn set_notes(&mut self, id: &QuestionId, notes: impl Into<String>) {
        let notes = notes.into();
        self.meta_mut(id).notes = (!notes.trim().is_empty()).then_some(notes);
    }

    /// Set confidence
    ///
    /// # Errors
    /// `InvalidConfidence` outside `1..=5`
    pub fn set_confidence(&mut self, id: &QuestionId, level: u8) -> Result<(), StateError> {
        let confidence = Confidence::new(level)?;
        self.meta_mut(id).confidence = Some(confidence);
        Ok(())
    }

    /// Toggle bookmark, returning the new state
    pub fn toggle_bookmark(&mut self, id: &QuestionId) -> bool {
        let meta = self.meta_mut(id);
        meta.bookmarked = !meta.bookmarked;
        meta.bookmarked
    }

    /// Toggle flag, returning the new state
    pub fn toggle_flag(&mut self, id: &QuestionId) -> bool {
        let meta = self.meta_mut(id);
        meta.flagged = !meta.flagged;
        meta.flagged
    }

    /// Replace assignments; returns `true` if they changed
    pub fn set_assignments(&mut self, id: &QuestionId, users: Vec<UserId>) -> bool {
        self.meta_mut(id).set_assignments(users)
    }

    /// Current assignments
    #[must_use]
    pub fn assignments(&self, id: &QuestionId) -> &[UserId] {
        self.meta
            .get(id)
            .map(|m| m.assignments.as_slice())
            .unwrap_or_default()
    }

    /// Attach an evidence link
    ///
    /// # Errors
    /// `DuplicateLink` if the question already links that evidence
    pub fn link_evidence(&mut self, id: &QuestionId, link: EvidenceLink) -> Result<(), StateError> {
        let meta = self.meta_mut(id);
        if meta.is_linked(&link.evidence_id) {
            return Err(StateError::DuplicateLink {
                question: id.to_string(),
                evidence: link.evidence_id.to_string(),
            });
        }
        meta.evidence_links.push(link);
        Ok(())
    }

    /// Remove an evidence link; absent links are a no-op
    ///
    /// Returns `true` if a link was removed.
    pub fn unlink_evidence(&mut self, id: &QuestionId, evidence: &EvidenceId) -> bool {
        let Some(meta) = self.meta.get_mut(id) else {
            return false;
        };
        let before = meta.evidence_links.len();
        meta.evidence_links.retain(|l| &l.evidence_id != evidence);
        before != meta.evidence_links.len()
    }

    /// Links attached to a question
    #[must_use]
    pub fn links_for(&self, id: &QuestionId) -> &[EvidenceLink] {
        self.meta
            .get(id)
            .map(|m| m.evidence_links.as_slice())
            .unwrap_or_default()
    }

    /// Questions linking a given evidence item
    pub fn questions_linking<'a>(&'a self, evidence: &'a EvidenceId) -> impl Iterator<Item = &'a QuestionId> {
        self.meta
            .iter()
            .filter(move |(_, m)| m.is_linked(evidence))
            .map(|(id, _)| id)
    }

    /// Bookmarked question ids
    pub fn bookmarked(&self) -> impl Iterator<Item = &QuestionId> {
        self.meta.iter().filter(|(_, m)| m.bookmarked).map(|(id, _)| id)
    }

    /// Flagged question ids
    pub fn flagged(&self) -> impl Iterator<Item = &QuestionId> {
        self.meta.iter().filter(|(_, m)| m.flagged).map(|(id, _)| id)
    }

    /// Drop all answers and annotations
    pub fn clear(&mut self) {
        self.responses.clear();
        self.meta.clear();
    }
}

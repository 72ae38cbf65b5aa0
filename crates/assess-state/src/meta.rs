//! Per-question annotation record

use crate::error::StateError;
use crate::evidence::EvidenceLink;
use crate::ids::{EvidenceId, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Self-reported confidence in an answer, 1 (low) to 5 (high)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    /// Lowest accepted level
    pub const MIN: u8 = 1;
    /// Highest accepted level
    pub const MAX: u8 = 5;

    /// Create confidence level
    ///
    /// # Errors
    /// `InvalidConfidence` outside `1..=5`
    pub fn new(level: u8) -> Result<Self, StateError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(StateError::InvalidConfidence(level))
        }
    }

    /// Numeric level
    #[inline]
    #[must_use]
    pub fn level(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = StateError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Confidence> for u8 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

/// Annotations attached to one question, independent of its answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMeta {
    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Confidence in the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Marked for later review
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bookmarked: bool,
    /// Flagged as problematic
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flagged: bool,
    /// Seconds spent before the first answer; written once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u64>,
    /// Assigned users
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<UserId>,
    /// Linked evidence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_links: Vec<EvidenceLink>,
}

impl QuestionMeta {
    /// Check if no annotation is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Record elapsed time unless already recorded
    ///
    /// Returns `true` if this call wrote the value.
    pub fn record_time_spent(&mut self, elapsed: Duration) -> bool {
        if self.time_spent_seconds.is_some() {
            return false;
        }
        self.time_spent_seconds = Some(elapsed.as_secs());
        true
    }

    /// Find the link for an evidence item
    #[must_use]
    pub fn link(&self, evidence: &EvidenceId) -> Option<&EvidenceLink> {
        self.evidence_links.iter().find(|l| &l.evidence_id == evidence)
    }

    /// Check if an evidence item is linked
    #[inline]
    #[must_use]
    pub fn is_linked(&self, evidence: &EvidenceId) -> bool {
        self.link(evidence).is_some()
    }

    /// Replace assignments, dropping duplicates while keeping order
    ///
    /// Returns `true` if the assignment list changed.
    pub fn set_assignments(&mut self, users: Vec<UserId>) -> bool {
        let mut deduped: Vec<UserId> = Vec::with_capacity(users.len());
        for user in users {
            if !deduped.contains(&user) {
                deduped.push(user);
            }
        }
        if deduped == self.assignments {
            return false;
        }
        self.assignments = deduped;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bounds() {
        assert!(Confidence::new(0).is_err());
        assert_eq!(Confidence::new(1).unwrap().level(), 1);
        assert_eq!(Confidence::new(5).unwrap().level(), 5);
        assert_eq!(Confidence::new(6), Err(StateError::InvalidConfidence(6)));
    }

    #[test]
    fn confidence_deserialization_is_checked() {
        assert!(serde_json::from_str::<Confidence>("3").is_ok());
        assert!(serde_json::from_str::<Confidence>("9").is_err());
    }

    #[test]
    fn time_spent_is_first_write_wins() {
        let mut meta = QuestionMeta::default();
        assert!(meta.record_time_spent(Duration::from_secs(12)));
        assert!(!meta.record_time_spent(Duration::from_secs(40)));
        assert_eq!(meta.time_spent_seconds, Some(12));
    }

    #[test]
    fn assignments_dedupe_and_report_change() {
        let mut meta = QuestionMeta::default();
        assert!(meta.set_assignments(vec!["ana".into(), "bo".into(), "ana".into()]));
        assert_eq!(meta.assignments, vec![UserId::new("ana"), UserId::new("bo")]);
        assert!(!meta.set_assignments(vec!["ana".into(), "bo".into()]));
    }

    #[test]
    fn default_meta_serializes_to_empty_object() {
        let meta = QuestionMeta::default();
        assert!(meta.is_empty());
        assert_eq!(serde_json::to_string(&meta).unwrap(), "{}");
    }
}

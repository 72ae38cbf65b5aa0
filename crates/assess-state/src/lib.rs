//! Assessment State
//!
//! The mutable half of an assessment session:
//!
//! - [`ResponseStore`]: answers plus one fixed-schema [`QuestionMeta`] per question
//! - [`EvidenceLibrary`]: assessment-scoped evidence items and link filters
//! - [`AssessmentSnapshot`]: the persisted unit, with its append-only change log
//!
//! Everything here is synchronous and owned by a single session; there is no
//! interior mutability.

#![warn(unreachable_pub)]

mod error;
mod evidence;
mod ids;
mod meta;
mod response;
mod snapshot;

pub use error::StateError;
pub use evidence::{
    matches_kind, matches_search, not_already_linked, Confidentiality, EvidenceFilter,
    EvidenceItem, EvidenceKind, EvidenceLibrary, EvidenceLink, LinkConfidence, Relevance,
};
pub use ids::{AssessmentId, ChangeId, EvidenceId, UserId};
pub use meta::{Confidence, QuestionMeta};
pub use response::{ResponseOutcome, ResponseRecord, ResponseStore};
pub use snapshot::{
    AssessmentSnapshot, AssessmentStatus, ChangeImpact, ChangeLogEntry, ChangeType, Completion,
    SessionTiming, SnapshotHeader,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

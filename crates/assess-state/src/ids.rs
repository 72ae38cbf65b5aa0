//! Identifiers for session-owned records

use assess_framework::string_id;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

string_id!(
    /// Evidence item identifier, as issued by file storage
    EvidenceId
);
string_id!(
    /// User identifier for assignments and link attribution
    UserId
);

/// Unique assessment identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssessmentId(pub Ulid);

impl AssessmentId {
    /// Generate new assessment ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AssessmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique change-log entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub Ulid);

impl ChangeId {
    /// Generate new change ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

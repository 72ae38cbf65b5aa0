//! Evidence library and question links
//!
//! The library is owned by the assessment and shared read-only across
//! questions; links live on each question's [`QuestionMeta`](crate::QuestionMeta).
//! Filtering is a pure read over both.

use crate::error::StateError;
use crate::ids::{EvidenceId, UserId};
use crate::response::ResponseStore;
use assess_framework::QuestionId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Broad evidence category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Text documents, PDFs
    Document,
    /// Screenshots, photos
    Image,
    /// Tabular data
    Spreadsheet,
    /// Compressed bundles
    Archive,
    /// Anything else
    #[default]
    Other,
}

impl EvidenceKind {
    /// Classify a MIME type
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.contains("spreadsheet") || mime.contains("excel") || mime == "text/csv" {
            Self::Spreadsheet
        } else if mime.contains("zip") || mime.contains("tar") || mime.contains("compressed") {
            Self::Archive
        } else if mime.starts_with("text/")
            || mime == "application/pdf"
            || mime.contains("word")
            || mime.contains("document")
        {
            Self::Document
        } else {
            Self::Other
        }
    }
}

/// Handling classification for an evidence item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidentiality {
    /// Shareable outside the organization
    Public,
    /// Organization-internal
    #[default]
    Internal,
    /// Need-to-know
    Confidential,
    /// Strictly limited
    Restricted,
}

/// Entry in the assessment's evidence library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Identifier issued by file storage
    pub id: EvidenceId,
    /// Display name
    pub name: String,
    /// Evidence category
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    /// Handling classification
    #[serde(default)]
    pub confidentiality: Confidentiality,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
    /// Location of the stored bytes
    #[serde(default)]
    pub url: String,
    /// Size of the stored bytes
    #[serde(default)]
    pub size_bytes: u64,
    /// MIME type of the stored bytes
    #[serde(default)]
    pub mime_type: String,
}

impl EvidenceItem {
    /// Create item with default classification and no location
    #[must_use]
    pub fn new(id: impl Into<EvidenceId>, name: impl Into<String>, kind: EvidenceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            confidentiality: Confidentiality::default(),
            tags: Vec::new(),
            uploaded_at: Utc::now(),
            url: String::new(),
            size_bytes: 0,
            mime_type: String::new(),
        }
    }

    /// With tags
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// With confidentiality
    #[inline]
    #[must_use]
    pub fn with_confidentiality(mut self, level: Confidentiality) -> Self {
        self.confidentiality = level;
        self
    }
}

/// How strongly an evidence item supports an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    /// Main supporting artifact
    #[default]
    Primary,
    /// Secondary support
    Supporting,
    /// Background reference
    Reference,
}

/// Reviewer confidence in a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkConfidence {
    /// Strong
    High,
    /// Moderate
    #[default]
    Medium,
    /// Weak
    Low,
}

/// Join record between a question and an evidence item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLink {
    /// Linked evidence
    pub evidence_id: EvidenceId,
    /// Relevance to the question
    pub relevance: Relevance,
    /// Confidence in the link
    pub confidence: LinkConfidence,
    /// Link time
    pub linked_at: DateTime<Utc>,
    /// Linking user
    pub linked_by: UserId,
}

impl EvidenceLink {
    /// Create link stamped with the current time
    #[must_use]
    pub fn new(
        evidence_id: EvidenceId,
        relevance: Relevance,
        confidence: LinkConfidence,
        linked_by: UserId,
    ) -> Self {
        Self {
            evidence_id,
            relevance,
            confidence,
            linked_at: Utc::now(),
            linked_by,
        }
    }
}

/// Insertion-ordered evidence library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EvidenceItem>", into = "Vec<EvidenceItem>")]
pub struct EvidenceLibrary {
    items: IndexMap<EvidenceId, EvidenceItem>,
}

impl EvidenceLibrary {
    /// Create empty library
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item
    ///
    /// # Errors
    /// `DuplicateEvidence` if the id is already present
    pub fn add(&mut self, item: EvidenceItem) -> Result<(), StateError> {
        if self.items.contains_key(&item.id) {
            return Err(StateError::DuplicateEvidence(item.id.to_string()));
        }
        tracing::debug!(evidence = %item.id, kind = ?item.kind, "evidence added to library");
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Look up an item
    #[inline]
    #[must_use]
    pub fn get(&self, id: &EvidenceId) -> Option<&EvidenceItem> {
        self.items.get(id)
    }

    /// Check if an item exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &EvidenceId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the library is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.items.values()
    }

    /// Items passing every criterion of `filter`
    #[must_use]
    pub fn filter<'a>(&'a self, filter: &EvidenceFilter, store: &ResponseStore) -> Vec<&'a EvidenceItem> {
        let links = filter
            .exclude_linked_to
            .as_ref()
            .map(|q| store.links_for(q))
            .unwrap_or_default();

        self.iter()
            .filter(|item| filter.search.as_deref().map_or(true, |term| matches_search(item, term)))
            .filter(|item| filter.kind.map_or(true, |kind| matches_kind(item, kind)))
            .filter(|item| not_already_linked(item, links))
            .collect()
    }
}

impl From<Vec<EvidenceItem>> for EvidenceLibrary {
    fn from(items: Vec<EvidenceItem>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }
}

impl From<EvidenceLibrary> for Vec<EvidenceItem> {
    fn from(library: EvidenceLibrary) -> Self {
        library.items.into_values().collect()
    }
}

/// Library search criteria
#[derive(Debug, Clone, Default)]
pub struct EvidenceFilter {
    /// Case-insensitive substring over name and tags
    pub search: Option<String>,
    /// Required kind
    pub kind: Option<EvidenceKind>,
    /// Hide items already linked to this question
    pub exclude_linked_to: Option<QuestionId>,
}

impl EvidenceFilter {
    /// Filter matching everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With search term
    #[inline]
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// With kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: EvidenceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Excluding items already linked to a question
    #[inline]
    #[must_use]
    pub fn excluding_linked_to(mut self, question: QuestionId) -> Self {
        self.exclude_linked_to = Some(question);
        self
    }
}

/// Case-insensitive substring match over name and tags; blank terms match
#[must_use]
pub fn matches_search(item: &EvidenceItem, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    item.name.to_lowercase().contains(&term)
        || item.tags.iter().any(|t| t.to_lowercase().contains(&term))
}

/// Kind equality
#[inline]
#[must_use]
pub fn matches_kind(item: &EvidenceItem, kind: EvidenceKind) -> bool {
    item.kind == kind
}

/// True when no link in `links` points at `item`
#[must_use]
pub fn not_already_linked(item: &EvidenceItem, links: &[EvidenceLink]) -> bool {
    links.iter().all(|l| l.evidence_id != item.id)
}

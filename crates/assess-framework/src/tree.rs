//! Framework tree types
//!
//! Plain serde data describing a questionnaire. Nothing here enforces
//! structural invariants; see [`crate::ValidatedFramework`].

use crate::ids::{CategoryId, FrameworkId, QuestionId, SectionId};
use serde::{Deserialize, Serialize};

/// Root of a questionnaire definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Framework {
    /// Framework identifier
    pub id: FrameworkId,
    /// Definition version, recorded in every snapshot
    #[serde(default = "default_version")]
    pub version: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Ordered sections
    #[serde(default)]
    pub sections: Vec<Section>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Framework {
    /// Create empty framework
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<FrameworkId>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            name: String::new(),
            sections: Vec::new(),
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a section
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Total number of questions across all sections
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(Section::question_count).sum()
    }

    /// Iterate over every question in traversal order
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|s| s.categories.iter())
            .flat_map(|c| c.questions.iter())
    }
}

/// Top-level grouping of categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier
    pub id: SectionId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Relative importance of the section
    #[serde(default)]
    pub priority: Priority,
    /// Weight used by the maturity score
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Ordered categories
    #[serde(default)]
    pub categories: Vec<Category>,
}

fn default_weight() -> f64 {
    1.0
}

impl Section {
    /// Create section with default priority and unit weight
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<SectionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: Priority::default(),
            weight: default_weight(),
            categories: Vec::new(),
        }
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// With weight
    #[inline]
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Append a category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    /// Number of questions in this section
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }

    /// Iterate over this section's questions in order
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.categories.iter().flat_map(|c| c.questions.iter())
    }
}

/// Grouping of questions inside a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier
    pub id: CategoryId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Ordered questions
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Category {
    /// Create empty category
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            questions: Vec::new(),
        }
    }

    /// Append a question
    #[inline]
    #[must_use]
    pub fn with_question(mut self, question: Question) -> Self {
        self.questions.push(question);
        self
    }
}

/// A single answerable question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question identifier
    pub id: QuestionId,
    /// Prompt text
    #[serde(default)]
    pub text: String,
    /// Priority, used for the high-priority progress counters
    #[serde(default)]
    pub priority: Priority,
    /// Declared answer options
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// Create question without options
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<QuestionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            priority: Priority::default(),
            options: Vec::new(),
        }
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Append an answer option
    #[inline]
    #[must_use]
    pub fn with_option(mut self, value: i32, label: impl Into<String>) -> Self {
        self.options.push(AnswerOption {
            value,
            label: label.into(),
        });
        self
    }

    /// Check whether `value` is one of the declared option values
    #[inline]
    #[must_use]
    pub fn accepts(&self, value: i32) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// Inclusive `(min, max)` of the declared option values
    #[must_use]
    pub fn value_range(&self) -> Option<(i32, i32)> {
        let min = self.options.iter().map(|o| o.value).min()?;
        let max = self.options.iter().map(|o| o.value).max()?;
        Some((min, max))
    }

    /// Answer value mapped onto `[0, 1]` over the option range
    ///
    /// Single-option questions score 1.0 when answered.
    #[must_use]
    pub fn normalized(&self, value: i32) -> Option<f64> {
        let (min, max) = self.value_range()?;
        if max == min {
            return Some(1.0);
        }
        let span = f64::from(max) - f64::from(min);
        Some(((f64::from(value) - f64::from(min)) / span).clamp(0.0, 1.0))
    }
}

/// A selectable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Stored value
    pub value: i32,
    /// Display label
    #[serde(default)]
    pub label: String,
}

/// Priority classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must be addressed first
    High,
    /// Default priority
    #[default]
    Medium,
    /// Nice to have
    Low,
}

impl Priority {
    /// Check if this is high priority
    #[inline]
    #[must_use]
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }
}

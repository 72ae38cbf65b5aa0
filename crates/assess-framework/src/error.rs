//! Framework validation and loading errors

use std::fmt;

/// Scope in which an identifier must be unique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScope {
    /// Section ids within the framework
    Section,
    /// Category ids within a section
    Category,
    /// Question ids across the framework
    Question,
}

impl fmt::Display for IdScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Section => f.write_str("section"),
            Self::Category => f.write_str("category"),
            Self::Question => f.write_str("question"),
        }
    }
}

/// Framework error
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// Section without categories
    #[error("section {section} has no categories")]
    EmptySection {
        /// Offending section
        section: String,
    },

    /// Category without questions
    #[error("category {category} in section {section} has no questions")]
    EmptyCategory {
        /// Parent section
        section: String,
        /// Offending category
        category: String,
    },

    /// Question without answer options
    #[error("question {question} declares no answer options")]
    NoOptions {
        /// Offending question
        question: String,
    },

    /// Identifier reused within its scope
    #[error("duplicate {scope} id: {id}")]
    DuplicateId {
        /// Uniqueness scope
        scope: IdScope,
        /// Repeated identifier
        id: String,
    },

    /// Two options share a value
    #[error("question {question} declares option value {value} more than once")]
    DuplicateOptionValue {
        /// Offending question
        question: String,
        /// Repeated value
        value: i32,
    },

    /// Weight is not a positive finite number
    #[error("section {section} has invalid weight {weight}")]
    InvalidWeight {
        /// Offending section
        section: String,
        /// Declared weight
        weight: f64,
    },

    /// Could not read the definition file
    #[error("failed to read framework: {0}")]
    Io(#[from] std::io::Error),

    /// JSON definition did not parse
    #[error("invalid JSON framework: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML definition did not parse
    #[error("invalid YAML framework: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension not recognised
    #[error("unsupported framework format: {0}")]
    UnsupportedFormat(String),
}

impl FrameworkError {
    /// Check if the error describes a structural integrity problem rather
    /// than an I/O or parse failure
    #[inline]
    #[must_use]
    pub fn is_integrity_error(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::Json(_) | Self::Yaml(_) | Self::UnsupportedFormat(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_display() {
        let err = FrameworkError::DuplicateId {
            scope: IdScope::Question,
            id: "q1".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate question id: q1");
        assert!(err.is_integrity_error());
    }

    #[test]
    fn format_errors_are_not_integrity_errors() {
        assert!(!FrameworkError::UnsupportedFormat("xml".to_string()).is_integrity_error());
    }
}

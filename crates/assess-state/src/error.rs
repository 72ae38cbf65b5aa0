//! Errors raised by local state mutations
//!
//! None of these leave the state partially modified.

/// State mutation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Answer is not one of the question's declared option values
    #[error("invalid response value {value} for question {question}")]
    InvalidResponseValue {
        /// Target question
        question: String,
        /// Rejected value
        value: i32,
    },

    /// Confidence outside 1..=5
    #[error("confidence must be between 1 and 5, got {0}")]
    InvalidConfidence(u8),

    /// Link for this (question, evidence) pair already exists
    #[error("evidence {evidence} is already linked to question {question}")]
    DuplicateLink {
        /// Target question
        question: String,
        /// Linked evidence
        evidence: String,
    },

    /// Evidence id not present in the library
    #[error("unknown evidence: {0}")]
    UnknownEvidence(String),

    /// Evidence id already present in the library
    #[error("evidence already in library: {0}")]
    DuplicateEvidence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_response_display() {
        let err = StateError::InvalidResponseValue {
            question: "q1".to_string(),
            value: 9,
        };
        assert_eq!(err.to_string(), "invalid response value 9 for question q1");
    }
}

//! Framework validation
//!
//! [`Framework::validate`] is the only way to obtain a [`ValidatedFramework`].
//! Once sealed, every section holds at least one category and every category
//! at least one question, so traversal never has to special-case empty
//! containers.

use crate::error::{FrameworkError, IdScope};
use crate::ids::{FrameworkId, QuestionId};
use crate::tree::{Framework, Question, Section};
use std::collections::{HashMap, HashSet};

/// Location of a question inside the tree, as indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Section index
    pub section: usize,
    /// Category index within the section
    pub category: usize,
    /// Question index within the category
    pub question: usize,
}

impl Position {
    /// Create position from indices
    #[inline]
    #[must_use]
    pub const fn new(section: usize, category: usize, question: usize) -> Self {
        Self {
            section,
            category,
            question,
        }
    }
}

/// A question together with its location
#[derive(Debug, Clone, Copy)]
pub struct QuestionEntry<'a> {
    /// Where the question lives
    pub position: Position,
    /// Owning section
    pub section: &'a Section,
    /// The question itself
    pub question: &'a Question,
}

/// Framework that passed structural validation
///
/// Immutable; carries an index from question id to position.
#[derive(Debug, Clone)]
pub struct ValidatedFramework {
    framework: Framework,
    index: HashMap<QuestionId, Position>,
}

impl Framework {
    /// Validate structure and seal the framework
    ///
    /// # Errors
    /// - `EmptySection` / `EmptyCategory` for containers without children
    /// - `NoOptions` for questions without answer options
    /// - `DuplicateId` when an id repeats within its scope
    /// - `DuplicateOptionValue` when a question repeats an option value
    /// - `InvalidWeight` for non-positive or non-finite section weights
    pub fn validate(self) -> Result<ValidatedFramework, FrameworkError> {
        let mut index = HashMap::with_capacity(self.question_count());
        let mut section_ids = HashSet::new();

        for (s_idx, section) in self.sections.iter().enumerate() {
            if !section_ids.insert(section.id.as_str()) {
                return Err(FrameworkError::DuplicateId {
                    scope: IdScope::Section,
                    id: section.id.to_string(),
                });
            }
            if !(section.weight.is_finite() && section.weight > 0.0) {
                return Err(FrameworkError::InvalidWeight {
                    section: section.id.to_string(),
                    weight: section.weight,
                });
            }
            if section.categories.is_empty() {
                return Err(FrameworkError::EmptySection {
                    section: section.id.to_string(),
                });
            }

            let mut category_ids = HashSet::new();
            for (c_idx, category) in section.categories.iter().enumerate() {
                if !category_ids.insert(category.id.as_str()) {
                    return Err(FrameworkError::DuplicateId {
                        scope: IdScope::Category,
                        id: category.id.to_string(),
                    });
                }
                if category.questions.is_empty() {
                    return Err(FrameworkError::EmptyCategory {
                        section: section.id.to_string(),
                        category: category.id.to_string(),
                    });
                }

                for (q_idx, question) in category.questions.iter().enumerate() {
                    validate_question(question)?;
                    let position = Position::new(s_idx, c_idx, q_idx);
                    if index.insert(question.id.clone(), position).is_some() {
                        return Err(FrameworkError::DuplicateId {
                            scope: IdScope::Question,
                            id: question.id.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            framework = %self.id,
            sections = self.sections.len(),
            questions = index.len(),
            "framework validated"
        );

        Ok(ValidatedFramework {
            framework: self,
            index,
        })
    }
}

fn validate_question(question: &Question) -> Result<(), FrameworkError> {
    if question.options.is_empty() {
        return Err(FrameworkError::NoOptions {
            question: question.id.to_string(),
        });
    }
    let mut seen = HashSet::new();
    for option in &question.options {
        if !seen.insert(option.value) {
            return Err(FrameworkError::DuplicateOptionValue {
                question: question.id.to_string(),
                value: option.value,
            });
        }
    }
    Ok(())
}

impl ValidatedFramework {
    /// Underlying definition
    #[inline]
    #[must_use]
    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    /// Framework id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FrameworkId {
        &self.framework.id
    }

    /// Framework version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.framework.version
    }

    /// Ordered sections
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.framework.sections
    }

    /// Total number of questions
    #[inline]
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.index.len()
    }

    /// Check if the framework has no questions at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check whether a question id belongs to this framework
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a question
    #[inline]
    #[must_use]
    pub fn position_of(&self, id: &QuestionId) -> Option<Position> {
        self.index.get(id).copied()
    }

    /// Question at a position
    #[must_use]
    pub fn question_at(&self, position: Position) -> Option<&Question> {
        self.framework
            .sections
            .get(position.section)?
            .categories
            .get(position.category)?
            .questions
            .get(position.question)
    }

    /// Look up a question with its location
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<QuestionEntry<'_>> {
        let position = self.position_of(id)?;
        let section = self.framework.sections.get(position.section)?;
        let question = self.question_at(position)?;
        Some(QuestionEntry {
            position,
            section,
            question,
        })
    }

    /// First question position, `None` for an empty framework
    #[must_use]
    pub fn first_position(&self) -> Option<Position> {
        (!self.is_empty()).then(|| Position::new(0, 0, 0))
    }

    /// Last question position, `None` for an empty framework
    #[must_use]
    pub fn last_position(&self) -> Option<Position> {
        let s_idx = self.framework.sections.len().checked_sub(1)?;
        let section = &self.framework.sections[s_idx];
        let c_idx = section.categories.len().checked_sub(1)?;
        let q_idx = section.categories[c_idx].questions.len().checked_sub(1)?;
        Some(Position::new(s_idx, c_idx, q_idx))
    }

    /// Iterate over every question with its position, in traversal order
    pub fn entries(&self) -> impl Iterator<Item = (Position, &Question)> {
        self.framework
            .sections
            .iter()
            .enumerate()
            .flat_map(|(s, section)| {
                section
                    .categories
                    .iter()
                    .enumerate()
                    .flat_map(move |(c, category)| {
                        category
                            .questions
                            .iter()
                            .enumerate()
                            .map(move |(q, question)| (Position::new(s, c, q), question))
                    })
            })
    }
}

//! Navigation cursor
//!
//! The cursor stores `(section, category, question)` indices into a
//! [`ValidatedFramework`]. Validation guarantees that no container is empty,
//! so every boundary crossing lands on a real question.

use crate::error::{EngineError, EngineResult};
use assess_framework::{Position, Question, QuestionId, ValidatedFramework};

/// Position within a framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    position: Position,
}

impl Cursor {
    /// Cursor at the first question
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor at an explicit position
    #[inline]
    #[must_use]
    pub fn at(position: Position) -> Self {
        Self { position }
    }

    /// Current indices
    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Question under the cursor, `None` while the framework is empty
    #[inline]
    #[must_use]
    pub fn current_question<'a>(&self, framework: &'a ValidatedFramework) -> Option<&'a Question> {
        framework.question_at(self.position)
    }

    /// Check if the cursor sits on the first question
    #[must_use]
    pub fn is_at_start(&self, framework: &ValidatedFramework) -> bool {
        framework.first_position().map_or(true, |p| p == self.position)
    }

    /// Check if the cursor sits on the last question
    #[must_use]
    pub fn is_at_end(&self, framework: &ValidatedFramework) -> bool {
        framework.last_position().map_or(true, |p| p == self.position)
    }

    /// Move to the next question
    ///
    /// Returns `false` without moving at the last question.
    pub fn advance(&mut self, framework: &ValidatedFramework) -> bool {
        let Some(next) = next_position(framework, self.position) else {
            return false;
        };
        tracing::debug!(from = ?self.position, to = ?next, "advance");
        self.position = next;
        true
    }

    /// Move to the previous question
    ///
    /// Returns `false` without moving at the first question.
    pub fn retreat(&mut self, framework: &ValidatedFramework) -> bool {
        let Some(prev) = previous_position(framework, self.position) else {
            return false;
        };
        tracing::debug!(from = ?self.position, to = ?prev, "retreat");
        self.position = prev;
        true
    }

    /// Move directly to a question
    ///
    /// # Errors
    /// `UnknownQuestion` if the id is not in the framework
    pub fn jump_to(&mut self, framework: &ValidatedFramework, id: &QuestionId) -> EngineResult<()> {
        let position = framework
            .position_of(id)
            .ok_or_else(|| EngineError::UnknownQuestion(id.to_string()))?;
        tracing::debug!(from = ?self.position, to = ?position, question = %id, "jump");
        self.position = position;
        Ok(())
    }

    /// Return to the first question
    pub fn rewind(&mut self) {
        self.position = Position::default();
    }
}

/// Position after `from`, `None` at the end
#[must_use]
pub fn next_position(framework: &ValidatedFramework, from: Position) -> Option<Position> {
    let sections = framework.sections();
    let section = sections.get(from.section)?;
    let category = section.categories.get(from.category)?;

    if from.question + 1 < category.questions.len() {
        return Some(Position::new(from.section, from.category, from.question + 1));
    }
    if from.category + 1 < section.categories.len() {
        return Some(Position::new(from.section, from.category + 1, 0));
    }
    if from.section + 1 < sections.len() {
        return Some(Position::new(from.section + 1, 0, 0));
    }
    None
}

/// Position before `from`, `None` at the start
///
/// Crossing a boundary lands on the last question of the prior container.
#[must_use]
pub fn previous_position(framework: &ValidatedFramework, from: Position) -> Option<Position> {
    let sections = framework.sections();
    let section = sections.get(from.section)?;

    if from.question > 0 {
        return Some(Position::new(from.section, from.category, from.question - 1));
    }
    if from.category > 0 {
        let c = from.category - 1;
        let last = section.categories.get(c)?.questions.len().checked_sub(1)?;
        return Some(Position::new(from.section, c, last));
    }
    if from.section > 0 {
        let s = from.section - 1;
        let prior = sections.get(s)?;
        let c = prior.categories.len().checked_sub(1)?;
        let q = prior.categories.get(c)?.questions.len().checked_sub(1)?;
        return Some(Position::new(s, c, q));
    }
    None
}

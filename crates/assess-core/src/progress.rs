//! Progress calculator
//!
//! Pure functions of a framework and a response store. Nothing is cached;
//! every call recomputes from the current state.

use assess_framework::{Priority, SectionId, ValidatedFramework};
use assess_state::{Completion, ResponseStore};
use serde::Serialize;

/// Completion of one section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionProgress {
    /// Section id
    pub section: SectionId,
    /// Section name
    pub name: String,
    /// Section priority
    pub priority: Priority,
    /// Answered/total within the section
    pub completion: Completion,
    /// Rounded completion percentage
    pub percentage: u8,
    /// Mean normalized answer value, `None` when nothing is answered
    pub score: Option<f64>,
}

/// Derived assessment metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// Total questions
    pub total: usize,
    /// Answered questions
    pub answered: usize,
    /// Rounded completion percentage
    pub percentage: u8,
    /// `answered == total`
    pub is_complete: bool,
    /// High-priority questions
    pub high_priority_total: usize,
    /// Answered high-priority questions
    pub high_priority_answered: usize,
    /// Bookmarked questions
    pub bookmarked: usize,
    /// Flagged questions
    pub flagged: usize,
    /// Weighted maturity score in `[0, 100]`, `None` when nothing is answered
    pub maturity_score: Option<f64>,
    /// Per-section breakdown, in framework order
    pub sections: Vec<SectionProgress>,
}

impl ProgressReport {
    /// Answered/total pair
    #[inline]
    #[must_use]
    pub fn completion(&self) -> Completion {
        Completion::new(self.answered, self.total)
    }
}

/// Answered/total over the whole framework
///
/// Only responses to questions of this framework count.
#[must_use]
pub fn completion(framework: &ValidatedFramework, store: &ResponseStore) -> Completion {
    let answered = framework
        .entries()
        .filter(|(_, q)| store.is_answered(&q.id))
        .count();
    Completion::new(answered, framework.question_count())
}

/// Full progress report
#[must_use]
pub fn calculate(framework: &ValidatedFramework, store: &ResponseStore) -> ProgressReport {
    let mut high_total = 0;
    let mut high_answered = 0;
    let mut bookmarked = 0;
    let mut flagged = 0;
    let mut sections = Vec::with_capacity(framework.sections().len());

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for section in framework.sections() {
        let mut answered = 0;
        let mut total = 0;
        let mut score_sum = 0.0;

        for question in section.questions() {
            total += 1;
            let value = store.value(&question.id);
            if question.priority.is_high() {
                high_total += 1;
                high_answered += usize::from(value.is_some());
            }
            if let Some(meta) = store.meta(&question.id) {
                bookmarked += usize::from(meta.bookmarked);
                flagged += usize::from(meta.flagged);
            }
            if let Some(value) = value {
                answered += 1;
                score_sum += question.normalized(value).unwrap_or(0.0);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let score = (answered > 0).then(|| score_sum / answered as f64);
        if let Some(score) = score {
            weighted_sum += score * section.weight;
            weight_total += section.weight;
        }

        let completion = Completion::new(answered, total);
        sections.push(SectionProgress {
            section: section.id.clone(),
            name: section.name.clone(),
            priority: section.priority,
            completion,
            percentage: completion.percentage(),
            score,
        });
    }

    let overall = Completion::new(sections.iter().map(|s| s.completion.answered).sum(), framework.question_count());
    let maturity_score = (weight_total > 0.0).then(|| weighted_sum / weight_total * 100.0);

    ProgressReport {
        total: overall.total,
        answered: overall.answered,
        percentage: overall.percentage(),
        is_complete: overall.is_complete(),
        high_priority_total: high_total,
        high_priority_answered: high_answered,
        bookmarked,
        flagged,
        maturity_score,
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_framework::{Category, Framework, Question, Section};

    fn q(id: &str, priority: Priority) -> Question {
        Question::new(id, "")
            .with_priority(priority)
            .with_option(0, "none")
            .with_option(2, "partial")
            .with_option(4, "full")
    }

    fn framework() -> ValidatedFramework {
        Framework::new("fw", "1")
            .with_section(
                Section::new("gov", "Governance").with_weight(3.0).with_category(
                    Category::new("c1", "")
                        .with_question(q("g1", Priority::High))
                        .with_question(q("g2", Priority::Medium)),
                ),
            )
            .with_section(
                Section::new("ops", "Operations").with_weight(1.0).with_category(
                    Category::new("c2", "")
                        .with_question(q("o1", Priority::High))
                        .with_question(q("o2", Priority::Low)),
                ),
            )
            .validate()
            .unwrap()
    }

    fn answer(store: &mut ResponseStore, fw: &ValidatedFramework, id: &str, value: i32) {
        let entry = fw.question(&id.into()).unwrap();
        store.set_response(entry.question, value, None).unwrap();
    }

    #[test]
    fn empty_store() {
        let fw = framework();
        let report = calculate(&fw, &ResponseStore::new());
        assert_eq!(report.total, 4);
        assert_eq!(report.answered, 0);
        assert_eq!(report.percentage, 0);
        assert!(!report.is_complete);
        assert_eq!(report.high_priority_total, 2);
        assert_eq!(report.maturity_score, None);
        assert!(report.sections.iter().all(|s| s.score.is_none()));
    }

    #[test]
    fn counts_and_high_priority() {
        let fw = framework();
        let mut store = ResponseStore::new();
        answer(&mut store, &fw, "g1", 4);
        answer(&mut store, &fw, "o2", 0);
        store.toggle_bookmark(&"g2".into());
        store.toggle_flag(&"o1".into());

        let report = calculate(&fw, &store);
        assert_eq!(report.answered, 2);
        assert_eq!(report.percentage, 50);
        assert_eq!(report.high_priority_answered, 1);
        assert_eq!(report.bookmarked, 1);
        assert_eq!(report.flagged, 1);
        assert_eq!(report.sections[0].completion, Completion::new(1, 2));
        assert_eq!(report.sections[1].percentage, 50);
        assert_eq!(report.completion(), completion(&fw, &store));
    }

    #[test]
    fn maturity_is_section_weighted() {
        let fw = framework();
        let mut store = ResponseStore::new();
        // gov: (1.0 + 0.5) / 2 = 0.75, ops: 0.0
        answer(&mut store, &fw, "g1", 4);
        answer(&mut store, &fw, "g2", 2);
        answer(&mut store, &fw, "o1", 0);

        let report = calculate(&fw, &store);
        let expected = (0.75 * 3.0 + 0.0) / 4.0 * 100.0;
        let score = report.maturity_score.unwrap();
        assert!((score - expected).abs() < 1e-9, "{score} != {expected}");
    }

    #[test]
    fn foreign_responses_are_ignored() {
        let fw = framework();
        let mut store = ResponseStore::new();
        let stray = Question::new("elsewhere", "").with_option(1, "yes");
        store.set_response(&stray, 1, None).unwrap();
        assert_eq!(completion(&fw, &store), Completion::new(0, 4));
    }

    #[test]
    fn empty_framework_has_zero_percent() {
        let fw = Framework::new("empty", "1").validate().unwrap();
        let report = calculate(&fw, &ResponseStore::new());
        assert_eq!(report.percentage, 0);
        assert_eq!(report.total, 0);
        assert!(report.is_complete);
        assert!(report.sections.is_empty());
    }
}

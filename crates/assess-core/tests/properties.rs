//! Property tests for navigation and progress invariants

use assess_core::navigation::{next_position, previous_position, Cursor};
use assess_core::progress;
use assess_framework::Position;
use assess_state::{Completion, ResponseStore};
use assess_test_utils::shaped_framework;
use proptest::prelude::*;

fn shape() -> impl Strategy<Value = (Vec<usize>, usize)> {
    (prop::collection::vec(1usize..4, 1..4), 1usize..4)
}

proptest! {
    #[test]
    fn advance_then_retreat_round_trips((sections, questions) in shape(), steps in 0usize..40) {
        let fw = shaped_framework(&sections, questions);
        let mut cursor = Cursor::new();
        for _ in 0..steps {
            cursor.advance(&fw);
        }
        let here = cursor.position();

        if cursor.advance(&fw) {
            prop_assert!(cursor.retreat(&fw));
            prop_assert_eq!(cursor.position(), here);
        } else {
            prop_assert_eq!(Some(here), fw.last_position());
        }

        if cursor.retreat(&fw) {
            prop_assert!(cursor.advance(&fw));
            prop_assert_eq!(cursor.position(), here);
        } else {
            prop_assert_eq!(here, Position::default());
        }
    }

    #[test]
    fn traversal_visits_every_question_once((sections, questions) in shape()) {
        let fw = shaped_framework(&sections, questions);
        let mut cursor = Cursor::new();
        let mut visited = vec![cursor.position()];
        while cursor.advance(&fw) {
            visited.push(cursor.position());
        }
        let expected: Vec<Position> = fw.entries().map(|(p, _)| p).collect();
        prop_assert_eq!(&visited, &expected);

        let mut back = vec![cursor.position()];
        while cursor.retreat(&fw) {
            back.push(cursor.position());
        }
        back.reverse();
        prop_assert_eq!(back, expected);
    }

    #[test]
    fn boundaries_have_no_neighbor((sections, questions) in shape()) {
        let fw = shaped_framework(&sections, questions);
        prop_assert_eq!(previous_position(&fw, Position::default()), None);
        let last = fw.last_position().unwrap();
        prop_assert_eq!(next_position(&fw, last), None);
    }

    #[test]
    fn completion_invariant(
        (sections, questions) in shape(),
        picks in prop::collection::vec((any::<prop::sample::Index>(), 0i32..=4), 0..30),
    ) {
        let fw = shaped_framework(&sections, questions);
        let all: Vec<_> = fw.entries().map(|(_, q)| q).collect();
        let mut store = ResponseStore::new();
        for (index, value) in picks {
            let question = all[index.index(all.len())];
            store.set_response(question, value, None).unwrap();
        }

        let report = progress::calculate(&fw, &store);
        let answered = all.iter().filter(|q| store.is_answered(&q.id)).count();
        let total = all.len();
        prop_assert_eq!(report.answered, answered);
        prop_assert_eq!(report.total, total);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let expected = (100.0 * answered as f64 / total as f64).round() as u8;
        prop_assert_eq!(report.percentage, expected);
        prop_assert_eq!(report.is_complete, answered == total);
        prop_assert_eq!(report.completion(), Completion::new(answered, total));

        let section_sum: usize = report.sections.iter().map(|s| s.completion.answered).sum();
        prop_assert_eq!(section_sum, answered);
        if let Some(score) = report.maturity_score {
            prop_assert!((0.0..=100.0).contains(&score));
        } else {
            prop_assert_eq!(answered, 0);
        }
    }
}

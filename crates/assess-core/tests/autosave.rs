//! Debounced and immediate commit paths against a recording store

use assess_core::prelude::*;
use assess_state::{ChangeImpact, ChangeType, UserId};
use assess_test_utils::{qid, two_by_two_framework, Fakes};
use std::time::Duration;
use tokio::time::Instant;

const QUIET: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn burst_of_edits_commits_once() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());

    session.answer(1).unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    session.set_notes(&qid("q1"), "documented in the ISMS").unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    session.set_confidence(&qid("q1"), 4).unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    session.toggle_flag(&qid("q2")).unwrap();

    assert_eq!(session.autosave_state(), AutosaveState::Scheduled);
    let deadline = session.next_autosave_deadline().unwrap();
    assert_eq!(deadline, Instant::now() + QUIET);

    // nothing is due before the quiet period elapses
    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(session.poll_autosave().await.unwrap().is_none());
    assert_eq!(fakes.store.attempts(), 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    let receipt = session.poll_autosave().await.unwrap().unwrap();
    assert_eq!(receipt.mutation_count, 4);
    assert_eq!(session.autosave_state(), AutosaveState::Idle);

    let saved = fakes.store.saved();
    assert_eq!(saved.len(), 1);
    let snapshot = &saved[0];
    assert_eq!(snapshot.answered_count, 1);
    let meta = &snapshot.question_meta[&qid("q1")];
    assert_eq!(meta.notes.as_deref(), Some("documented in the ISMS"));
    assert!(snapshot.question_meta[&qid("q2")].flagged);

    assert_eq!(snapshot.change_log.len(), 1);
    let entry = &snapshot.change_log[0];
    assert_eq!(entry.change_type, ChangeType::ResponseModified);
    assert_eq!(entry.impact, ChangeImpact::Medium);
    assert!(entry.rollbackable);
    assert_eq!(entry.mutation_count, 4);
    assert_eq!(session.change_log(), snapshot.change_log.as_slice());
}

#[tokio::test(start_paused = true)]
async fn snapshot_reflects_state_at_expiry() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());

    session.answer(1).unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;
    session.answer(3).unwrap();

    session.autosave_when_due().await.unwrap().unwrap();
    let snapshot = fakes.store.last().unwrap();
    assert_eq!(snapshot.responses[&qid("q1")].value, 3);
}

#[tokio::test(start_paused = true)]
async fn autosave_when_due_without_pending_work() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    assert!(session.autosave_when_due().await.unwrap().is_none());
    assert_eq!(fakes.store.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn separate_bursts_commit_separately() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());

    session.set_response(&qid("q1"), 1).unwrap();
    session.autosave_when_due().await.unwrap();
    session.set_response(&qid("q2"), 1).unwrap();
    session.set_response(&qid("q3"), 1).unwrap();
    session.autosave_when_due().await.unwrap();

    let saved = fakes.store.saved();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1].change_log.len(), 2);
    assert_eq!(saved[1].change_log[1].mutation_count, 2);
    assert_eq!(saved[1].answered_count, 3);
}

#[tokio::test(start_paused = true)]
async fn assignment_saves_immediately_and_keeps_timer() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());

    session.answer(2).unwrap();
    let deadline = session.next_autosave_deadline().unwrap();

    let changed = session
        .set_assignments(&qid("q1"), vec![UserId::new("alice"), UserId::new("bob")])
        .await
        .unwrap();
    assert!(changed);
    assert_eq!(fakes.store.save_count(), 1, "assignment is written without waiting");

    let snapshot = fakes.store.last().unwrap();
    let entry = snapshot.latest_change().unwrap();
    assert_eq!(entry.change_type, ChangeType::AssignmentChanged);
    assert_eq!(entry.impact, ChangeImpact::Low);
    assert_eq!(snapshot.question_meta[&qid("q1")].assignments.len(), 2);

    // the pending debounce survives the side save
    assert_eq!(session.autosave_state(), AutosaveState::Scheduled);
    assert_eq!(session.next_autosave_deadline(), Some(deadline));
    session.autosave_when_due().await.unwrap().unwrap();
    assert_eq!(fakes.store.save_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn unchanged_assignment_is_not_saved() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    let users = vec![UserId::new("alice")];

    assert!(session.set_assignments(&qid("q2"), users.clone()).await.unwrap());
    assert!(!session.set_assignments(&qid("q2"), users).await.unwrap());
    assert_eq!(fakes.store.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_autosave_stays_dirty_until_retry() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    fakes.store.set_failing(true);

    session.answer(1).unwrap();
    session.toggle_bookmark(&qid("q1")).unwrap();
    let err = session.autosave_when_due().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.autosave_state(), AutosaveState::Dirty);
    assert!(session.has_unsaved_changes());
    assert!(session.change_log().is_empty());
    assert_eq!(fakes.notifier.count(NotificationLevel::Error), 1);

    // no timer is armed after a failure
    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(session.poll_autosave().await.unwrap().is_none());

    // the next mutation re-arms and the retry carries everything
    fakes.store.set_failing(false);
    session.set_notes(&qid("q1"), "retry").unwrap();
    let receipt = session.autosave_when_due().await.unwrap().unwrap();
    assert_eq!(receipt.mutation_count, 3);

    let snapshot = fakes.store.last().unwrap();
    assert_eq!(snapshot.answered_count, 1);
    assert!(snapshot.question_meta[&qid("q1")].bookmarked);
    assert_eq!(snapshot.change_log.len(), 1);
    assert_eq!(fakes.store.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_save_retries_after_failure() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    fakes.store.set_failing(true);
    session.answer(4).unwrap();
    assert!(session.autosave_when_due().await.is_err());

    fakes.store.set_failing(false);
    let receipt = session.save_now().await.unwrap();
    assert_eq!(receipt.mutation_count, 1);
    assert_eq!(session.autosave_state(), AutosaveState::Idle);
    let entry = fakes.store.last().unwrap().latest_change().cloned().unwrap();
    assert_eq!(entry.change_type, ChangeType::ManualSave);
    assert_eq!(fakes.notifier.last().unwrap().0, NotificationLevel::Success);
}

#[tokio::test(start_paused = true)]
async fn save_now_flushes_pending_timer() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    session.answer(0).unwrap();
    session.save_now().await.unwrap();

    assert!(session.next_autosave_deadline().is_none());
    tokio::time::advance(QUIET * 2).await;
    assert!(session.poll_autosave().await.unwrap().is_none());
    assert_eq!(fakes.store.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_assignment_save_marks_dirty() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    fakes.store.set_failing(true);

    let err = session
        .set_assignments(&qid("q3"), vec![UserId::new("carol")])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Commit(_)));
    assert_eq!(session.autosave_state(), AutosaveState::Dirty);
    assert_eq!(session.responses().assignments(&qid("q3")).len(), 1, "state is kept for retry");

    fakes.store.set_failing(false);
    session.save_now().await.unwrap();
    assert!(!session.has_unsaved_changes());
}

#[tokio::test(start_paused = true)]
async fn success_notifications_are_opt_in() {
    let fakes = Fakes::new();
    let config = EngineConfig::new().with_success_notifications(true).with_quiet_period(Duration::from_secs(1));
    let mut session = AssessmentSession::new(two_by_two_framework(), config, fakes.collaborators());

    session.answer(1).unwrap();
    assert_eq!(session.next_autosave_deadline(), Some(Instant::now() + Duration::from_secs(1)));
    session.autosave_when_due().await.unwrap();
    assert_eq!(fakes.notifier.count(NotificationLevel::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn autosaves_are_silent_by_default() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    session.answer(1).unwrap();
    session.autosave_when_due().await.unwrap();
    assert!(fakes.notifier.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_discards_pending_save() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    session.answer(1).unwrap();
    assert!(session.close());

    tokio::time::advance(QUIET * 2).await;
    assert_eq!(fakes.store.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn task_creation_needs_assignees() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());

    let err = session.create_task(&qid("q2")).await.unwrap_err();
    assert!(matches!(err, EngineError::NoAssignees(_)));
    assert_eq!(fakes.notifier.count(NotificationLevel::Warning), 1);
    assert!(fakes.tasks.calls().is_empty());

    session
        .set_assignments(&qid("q2"), vec![UserId::new("dana")])
        .await
        .unwrap();
    let task = session.create_task(&qid("q2")).await.unwrap();
    assert_eq!(task.question, qid("q2"));
    assert_eq!(fakes.tasks.calls(), vec![(qid("q2"), vec![UserId::new("dana")])]);
}

#[tokio::test(start_paused = true)]
async fn failed_task_creation_is_notified_and_returned() {
    let fakes = Fakes::new();
    let mut session = fakes.session(two_by_two_framework());
    session
        .set_assignments(&qid("q1"), vec![UserId::new("erin")])
        .await
        .unwrap();
    fakes.tasks.set_failing(true);

    let err = session.create_task(&qid("q1")).await.unwrap_err();
    assert!(matches!(err, EngineError::Collaborator(_)));
    assert!(err.is_retryable());
    assert_eq!(fakes.notifier.count(NotificationLevel::Error), 1);
    assert_eq!(fakes.notifier.count(NotificationLevel::Success), 0);
    assert_eq!(fakes.tasks.calls().len(), 1);
}

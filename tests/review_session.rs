// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end review sessions against both record stores.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use recall::session::{ReviewConfig, SessionQueue, SessionService};
use recall::srs::{Clock, FixedClock, Outcome, Scheduler, StageTable};
use recall::store::{MemoryStore, RecordStore, SharedStore, SqliteStore};
use recall::types::{Card, Item, SessionStatus};
use recall::ReviewError;

/// Whole seconds so timestamps survive the SQLite round trip unchanged.
fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

struct Harness {
    service: SessionService,
    store: SharedStore,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn new(store: SharedStore, hours: Vec<u32>) -> Self {
        let clock = Arc::new(FixedClock::new(epoch()));
        let scheduler = Scheduler::new(StageTable::new(hours).unwrap(), clock.clone());
        let service =
            SessionService::with_scheduler(store.clone(), scheduler, ReviewConfig::default());
        Self {
            service,
            store,
            clock,
        }
    }

    async fn track(&self, front: &str, back: &str, stage: i64) -> Item {
        let card = Card::new(front, back);
        self.store.create_card(&card).await.unwrap();
        self.service.add_item(&card.id, Some(stage)).await.unwrap()
    }

    async fn item(&self, id: &str) -> Item {
        self.store.get_item(id).await.unwrap().unwrap()
    }
}

fn sqlite(temp: &TempDir) -> SharedStore {
    Arc::new(SqliteStore::open_at(&temp.path().join("recall.db")).unwrap())
}

/// Answer every item correctly, except `wrong_once` which misses its first pass.
fn drive(queue: &mut SessionQueue, clock: &FixedClock, wrong_once: &str) {
    let mut missed = false;
    while let Some(bout) = queue.current() {
        let card = bout.card.clone();
        if card.front == wrong_once && !missed {
            missed = true;
            clock.advance(Duration::seconds(3));
            assert!(!queue.submit_guess("no idea").unwrap());
        } else {
            clock.advance(Duration::seconds(2));
            assert!(queue.submit_guess(&card.back).unwrap());
        }
        queue.proceed().unwrap();
    }
}

// ============================================================================
// Scheduling Scenarios
// ============================================================================

#[tokio::test]
async fn test_clean_review_moves_item_up_a_stage() {
    let temp = TempDir::new().unwrap();
    let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
    let item = h.track("uno", "one", 1).await;
    assert_eq!(item.next_available, epoch() + Duration::hours(4));

    let session = h.service.create_session(vec![item.id.clone()]).await.unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();
    drive(&mut queue, &h.clock, "");
    h.service
        .complete_session(&session.id, None, &queue.bout_records())
        .await
        .unwrap();

    let stored = h.item(&item.id).await;
    assert_eq!(stored.current_stage, 2);
    assert_eq!(stored.next_available, h.clock.now() + Duration::hours(8));
    assert_eq!(stored.current_streak, 1);
    assert_eq!(stored.max_streak, 1);
}

#[tokio::test]
async fn test_two_misses_drop_item_to_stage_zero() {
    let temp = TempDir::new().unwrap();
    let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
    let item = h.track("uno", "one", 1).await;

    let session = h.service.create_session(vec![item.id.clone()]).await.unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();
    queue.submit_guess("uan").unwrap();
    queue.retry().unwrap();
    queue.submit_guess("wun").unwrap();
    queue.retry().unwrap();
    queue.submit_guess("one").unwrap();
    queue.proceed().unwrap();
    assert!(queue.is_exhausted());

    h.service
        .complete_session(&session.id, None, &queue.bout_records())
        .await
        .unwrap();

    let stored = h.item(&item.id).await;
    assert_eq!(stored.current_stage, 0);
    assert_eq!(stored.next_available, h.clock.now());
    assert_eq!(stored.current_streak, 1);
    assert_eq!(stored.times_incorrect, 2);
}

#[test]
fn test_out_of_range_stages_clamp() {
    let clock = Arc::new(FixedClock::new(epoch()));
    let scheduler = Scheduler::new(StageTable::new(vec![0, 4, 8]).unwrap(), clock);

    assert_eq!(scheduler.next_stage(100, Outcome::correct()), 2);
    assert_eq!(scheduler.next_stage(-5, Outcome::incorrect(1)), 0);
    assert_eq!(scheduler.next_stage(-5, Outcome::correct()), 0);
    assert_eq!(
        scheduler.advance(99, Outcome::correct()).next_available,
        epoch() + Duration::hours(8)
    );
}

// ============================================================================
// Session Queue Through Commit
// ============================================================================

#[tokio::test]
async fn test_requeued_item_commits_one_review_with_both_passes() {
    let temp = TempDir::new().unwrap();
    let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
    let a = h.track("A", "alpha", 1).await;
    let b = h.track("B", "bravo", 1).await;

    let session = h
        .service
        .create_session(vec![a.id.clone(), b.id.clone()])
        .await
        .unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();
    drive(&mut queue, &h.clock, "B");

    let done = h
        .service
        .complete_session(&session.id, None, &queue.bout_records())
        .await
        .unwrap();
    assert_eq!(done.status, SessionStatus::Complete);

    let reviews = h.store.reviews_for_session(&session.id).await.unwrap();
    assert_eq!(reviews.len(), 2);

    let review_a = reviews.iter().find(|r| r.item_id == a.id).unwrap();
    assert_eq!(review_a.times_incorrect, 0);
    assert_eq!(review_a.seconds_elapsed, 2);
    assert_eq!(review_a.ending_stage, 2);

    let review_b = reviews.iter().find(|r| r.item_id == b.id).unwrap();
    assert_eq!(review_b.times_incorrect, 1);
    assert_eq!(review_b.seconds_elapsed, 5);
    assert_eq!(review_b.ending_stage, 0);

    let stored = h.service.get_session(&session.id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Complete);
    assert_eq!(stored.ended_at, Some(h.clock.now()));
}

#[tokio::test]
async fn test_cancel_mid_session_keeps_partial_bouts() {
    let h = Harness::new(Arc::new(MemoryStore::new()), vec![0, 4, 8]);
    let a = h.track("A", "alpha", 1).await;
    let b = h.track("B", "bravo", 1).await;
    let c = h.track("C", "charlie", 1).await;

    let session = h
        .service
        .create_session(vec![a.id.clone(), b.id.clone(), c.id.clone()])
        .await
        .unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();

    let first = queue.current().unwrap().card.back.clone();
    queue.submit_guess(&first).unwrap();
    queue.proceed().unwrap();
    queue.skip().unwrap();

    let records = queue.bout_records();
    assert_eq!(records.len(), 2);

    let done = h
        .service
        .cancel_session(&session.id, None, &records)
        .await
        .unwrap();
    assert_eq!(done.status, SessionStatus::Cancelled);
    assert_eq!(h.store.reviews_for_session(&session.id).await.unwrap().len(), 2);
}

// ============================================================================
// Commit Atomicity
// ============================================================================

#[tokio::test]
async fn test_fault_mid_commit_writes_nothing() {
    let memory = Arc::new(MemoryStore::new());
    let h = Harness::new(memory.clone(), vec![0, 4, 8]);
    let a = h.track("A", "alpha", 1).await;
    let b = h.track("B", "bravo", 1).await;

    let session = h
        .service
        .create_session(vec![a.id.clone(), b.id.clone()])
        .await
        .unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();
    drive(&mut queue, &h.clock, "");
    let records = queue.bout_records();

    // Fail after the first review and item update are staged
    memory.inject_commit_fault(2);
    let err = h
        .service
        .complete_session(&session.id, None, &records)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::CommitFailure(_)));

    assert!(h.store.reviews_for_session(&session.id).await.unwrap().is_empty());
    assert_eq!(h.item(&a.id).await, a);
    assert_eq!(h.item(&b.id).await, b);
    assert_eq!(
        h.service.get_session(&session.id).await.unwrap().status,
        SessionStatus::Started
    );

    // The whole commit can be retried
    h.service
        .complete_session(&session.id, None, &records)
        .await
        .unwrap();
    assert_eq!(h.store.reviews_for_session(&session.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_deleted_item_rolls_back_sqlite_commit() {
    let temp = TempDir::new().unwrap();
    let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
    let a = h.track("A", "alpha", 1).await;
    let b = h.track("B", "bravo", 1).await;

    let session = h
        .service
        .create_session(vec![a.id.clone(), b.id.clone()])
        .await
        .unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();
    drive(&mut queue, &h.clock, "");
    let records = queue.bout_records();

    h.store.delete_item(&b.id).await.unwrap();
    let err = h
        .service
        .complete_session(&session.id, None, &records)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::CommitFailure(_)));
    assert!(err.is_retryable());

    assert!(h.store.reviews_for_session(&session.id).await.unwrap().is_empty());
    assert_eq!(h.item(&a.id).await.times_reviewed, 0);
    assert_eq!(
        h.service.get_session(&session.id).await.unwrap().status,
        SessionStatus::Started
    );

    // Cancelling with the surviving bout goes through
    let surviving: Vec<_> = records.into_iter().filter(|r| r.item_id == a.id).collect();
    let done = h
        .service
        .cancel_session(&session.id, None, &surviving)
        .await
        .unwrap();
    assert_eq!(done.status, SessionStatus::Cancelled);
    assert_eq!(h.item(&a.id).await.times_reviewed, 1);
}

#[tokio::test]
async fn test_terminal_session_rejects_second_commit() {
    let temp = TempDir::new().unwrap();
    let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
    let a = h.track("A", "alpha", 0).await;

    let session = h.service.create_session(vec![a.id.clone()]).await.unwrap();
    let mut queue = h.service.start_queue(&session.id).await.unwrap();
    drive(&mut queue, &h.clock, "");
    let records = queue.bout_records();

    h.service
        .cancel_session(&session.id, None, &records)
        .await
        .unwrap();

    for attempt in [
        h.service.complete_session(&session.id, None, &records).await,
        h.service.cancel_session(&session.id, None, &records).await,
    ] {
        let err = attempt.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition(_)));
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    assert_eq!(h.store.reviews_for_session(&session.id).await.unwrap().len(), 1);
    assert_eq!(h.item(&a.id).await.times_reviewed, 1);
}

// ============================================================================
// Due Items and Persistence
// ============================================================================

#[tokio::test]
async fn test_due_items_follow_the_clock() {
    let h = Harness::new(Arc::new(MemoryStore::new()), vec![0, 4, 8]);
    let now = h.track("A", "alpha", 0).await;
    let soon = h.track("B", "bravo", 1).await;
    let later = h.track("C", "charlie", 2).await;

    let due = h.service.get_due_items(epoch()).await.unwrap();
    assert_eq!(due.iter().map(|i| &i.id).collect::<Vec<_>>(), vec![&now.id]);

    let due = h
        .service
        .get_due_items(epoch() + Duration::hours(4))
        .await
        .unwrap();
    assert_eq!(
        due.iter().map(|i| &i.id).collect::<Vec<_>>(),
        vec![&now.id, &soon.id]
    );

    let due = h.service.get_due_items(epoch() + Duration::days(1)).await.unwrap();
    assert_eq!(due.len(), 3);
    assert_eq!(due[2].id, later.id);
}

#[tokio::test]
async fn test_sqlite_state_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let (session_id, item_id) = {
        let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
        let a = h.track("A", "alpha", 1).await;
        let session = h.service.create_session(vec![a.id.clone()]).await.unwrap();
        let mut queue = h.service.start_queue(&session.id).await.unwrap();
        drive(&mut queue, &h.clock, "");
        h.service
            .complete_session(&session.id, None, &queue.bout_records())
            .await
            .unwrap();
        (session.id, a.id)
    };

    let h = Harness::new(sqlite(&temp), vec![0, 4, 8]);
    let session = h.service.get_session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(session.item_ids, vec![item_id.clone()]);
    assert_eq!(h.item(&item_id).await.current_stage, 2);

    let summary = h.service.session_summary(&session_id).await.unwrap();
    assert_eq!(summary.rows.len(), 1);
    assert_eq!(summary.rows[0].card_front.as_deref(), Some("A"));
    assert_eq!(summary.percent_correct(), 1.0);
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process record store.
//!
//! Commits are applied to a copy of the tables which replaces the live tables
//! only once every write has succeeded. A one-shot fault can be armed to fail a
//! commit part-way through, which is how the lifecycle's rollback behavior is
//! exercised in tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{RecordKind, StoreError};
use crate::types::{Card, Item, Review, ReviewSession};

use super::{CommitBatch, RecordStore, StoreResult, WriteOp};

#[derive(Debug, Clone, Default)]
struct Tables {
    cards: HashMap<String, Card>,
    items: HashMap<String, Item>,
    sessions: HashMap<String, ReviewSession>,
    reviews: Vec<Review>,
}

impl Tables {
    fn apply(&mut self, op: &WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::CreateReview(review) => {
                if self.reviews.iter().any(|r| r.id == review.id) {
                    return Err(StoreError::Conflict(format!(
                        "review {} already exists",
                        review.id
                    )));
                }
                self.reviews.push(review.clone());
            }
            WriteOp::UpdateItem(item) => match self.items.get_mut(&item.id) {
                Some(slot) => *slot = item.clone(),
                None => return Err(StoreError::not_found(RecordKind::Item, &item.id)),
            },
            WriteOp::FinalizeSession { session, expected } => {
                let stored = self
                    .sessions
                    .get_mut(&session.id)
                    .ok_or_else(|| StoreError::not_found(RecordKind::Session, &session.id))?;
                if stored.status != *expected {
                    return Err(StoreError::Conflict(format!(
                        "session {} is {}, expected {}",
                        session.id, stored.status, expected
                    )));
                }
                stored.status = session.status;
                stored.ended_at = session.ended_at;
            }
        }
        Ok(())
    }
}

/// Record store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fault_after: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next commit after `after_ops` of its writes have been applied.
    ///
    /// The fault fires once and then disarms.
    pub fn inject_commit_fault(&self, after_ops: usize) {
        *lock(&self.fault_after) = Some(after_ops);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        lock(&self.tables)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_card(&self, card: &Card) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.cards.contains_key(&card.id) {
            return Err(StoreError::Conflict(format!("card {} already exists", card.id)));
        }
        tables.cards.insert(card.id.clone(), card.clone());
        Ok(())
    }

    async fn get_card(&self, id: &str) -> StoreResult<Option<Card>> {
        Ok(self.tables().cards.get(id).cloned())
    }

    async fn list_cards(&self) -> StoreResult<Vec<Card>> {
        let mut cards: Vec<Card> = self.tables().cards.values().cloned().collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    async fn update_card(&self, card: &Card) -> StoreResult<()> {
        let mut tables = self.tables();
        match tables.cards.get_mut(&card.id) {
            Some(slot) => {
                *slot = card.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(RecordKind::Card, &card.id)),
        }
    }

    async fn delete_card(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables();
        let removed = tables.cards.remove(id).is_some();
        if removed {
            tables.items.retain(|_, item| item.card_id != id);
        }
        Ok(removed)
    }

    async fn create_item(&self, item: &Item) -> StoreResult<()> {
        let mut tables = self.tables();
        if !tables.cards.contains_key(&item.card_id) {
            return Err(StoreError::not_found(RecordKind::Card, &item.card_id));
        }
        let duplicate = tables.items.values().any(|existing| {
            existing.id == item.id
                || (existing.reviewer_id == item.reviewer_id && existing.card_id == item.card_id)
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "reviewer {} already tracks card {}",
                item.reviewer_id, item.card_id
            )));
        }
        tables.items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn get_item(&self, id: &str) -> StoreResult<Option<Item>> {
        Ok(self.tables().items.get(id).cloned())
    }

    async fn find_item(&self, reviewer_id: &str, card_id: &str) -> StoreResult<Option<Item>> {
        Ok(self
            .tables()
            .items
            .values()
            .find(|item| item.reviewer_id == reviewer_id && item.card_id == card_id)
            .cloned())
    }

    async fn list_items(&self, reviewer_id: &str) -> StoreResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .tables()
            .items
            .values()
            .filter(|item| item.reviewer_id == reviewer_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn due_items(&self, reviewer_id: &str, as_of: DateTime<Utc>) -> StoreResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .tables()
            .items
            .values()
            .filter(|item| item.reviewer_id == reviewer_id && item.is_due(as_of))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.next_available.cmp(&b.next_available));
        Ok(items)
    }

    async fn delete_item(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables().items.remove(id).is_some())
    }

    async fn create_session(&self, session: &ReviewSession) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<ReviewSession>> {
        Ok(self.tables().sessions.get(id).cloned())
    }

    async fn list_sessions(&self) -> StoreResult<Vec<ReviewSession>> {
        let mut sessions: Vec<ReviewSession> = self.tables().sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables().sessions.remove(id).is_some())
    }

    async fn get_review(&self, id: &str) -> StoreResult<Option<Review>> {
        Ok(self.tables().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn reviews_for_session(&self, session_id: &str) -> StoreResult<Vec<Review>> {
        Ok(self
            .tables()
            .reviews
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn reviews_for_item(&self, item_id: &str) -> StoreResult<Vec<Review>> {
        Ok(self
            .tables()
            .reviews
            .iter()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn delete_review(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables();
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() < before)
    }

    async fn commit(&self, batch: CommitBatch) -> StoreResult<()> {
        let fault_after = lock(&self.fault_after).take();
        let mut tables = self.tables();
        let mut staged = tables.clone();

        for (index, op) in batch.ops().iter().enumerate() {
            if fault_after == Some(index) {
                warn!(index, "injected commit fault");
                return Err(StoreError::Fault(format!(
                    "commit interrupted before write {}",
                    index
                )));
            }
            staged.apply(op)?;
        }

        *tables = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionStatus, DEFAULT_REVIEWER};

    async fn seeded() -> (MemoryStore, Item, ReviewSession) {
        let store = MemoryStore::new();
        let card = Card::new("gato", "cat");
        store.create_card(&card).await.unwrap();
        let item = Item::new(DEFAULT_REVIEWER, card.id, 0, Utc::now());
        store.create_item(&item).await.unwrap();
        let session = ReviewSession::new(vec![item.id.clone()], Utc::now());
        store.create_session(&session).await.unwrap();
        (store, item, session)
    }

    fn finish_batch(item: &Item, session: &ReviewSession) -> CommitBatch {
        let mut updated = item.clone();
        updated.current_stage = 1;
        updated.times_reviewed = 1;

        let mut batch = CommitBatch::new();
        batch.update_item(updated);
        batch.finalize_session(
            session.finalized(SessionStatus::Complete, Utc::now()),
            SessionStatus::Started,
        );
        batch
    }

    #[tokio::test]
    async fn test_commit_applies_batch() {
        let (store, item, session) = seeded().await;
        store.commit(finish_batch(&item, &session)).await.unwrap();

        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().current_stage, 1);
        assert_eq!(
            store.get_session(&session.id).await.unwrap().unwrap().status,
            SessionStatus::Complete
        );
    }

    #[tokio::test]
    async fn test_injected_fault_leaves_tables_untouched() {
        let (store, item, session) = seeded().await;
        store.inject_commit_fault(1);

        let err = store.commit(finish_batch(&item, &session)).await.unwrap_err();
        assert!(matches!(err, StoreError::Fault(_)));
        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().current_stage, 0);
        assert_eq!(
            store.get_session(&session.id).await.unwrap().unwrap().status,
            SessionStatus::Started
        );

        // One-shot: the retry goes through
        store.commit(finish_batch(&item, &session)).await.unwrap();
        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().times_reviewed, 1);
    }

    #[tokio::test]
    async fn test_missing_item_aborts_commit() {
        let (store, item, session) = seeded().await;
        store.delete_item(&item.id).await.unwrap();

        let err = store.commit(finish_batch(&item, &session)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            store.get_session(&session.id).await.unwrap().unwrap().status,
            SessionStatus::Started
        );
    }

    #[tokio::test]
    async fn test_item_uniqueness_and_cascade() {
        let store = MemoryStore::new();
        let card = Card::new("uno", "one");
        store.create_card(&card).await.unwrap();
        store
            .create_item(&Item::new(DEFAULT_REVIEWER, card.id.clone(), 0, Utc::now()))
            .await
            .unwrap();

        let err = store
            .create_item(&Item::new(DEFAULT_REVIEWER, card.id.clone(), 3, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert!(store.delete_card(&card.id).await.unwrap());
        assert!(store.list_items(DEFAULT_REVIEWER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_lookup_and_deletes() {
        let (store, item, session) = seeded().await;
        let review = Review {
            id: crate::types::generate_id(),
            created_at: Utc::now(),
            session_id: session.id.clone(),
            item_id: item.id.clone(),
            card_id: item.card_id.clone(),
            starting_stage: 0,
            ending_stage: 1,
            seconds_elapsed: 3,
            times_incorrect: 0,
        };
        let mut batch = finish_batch(&item, &session);
        batch.create_review(review.clone());
        store.commit(batch).await.unwrap();

        let by_item = store.reviews_for_item(&item.id).await.unwrap();
        assert_eq!(by_item.len(), 1);
        assert_eq!(by_item[0].id, review.id);
        assert!(store.reviews_for_item("other").await.unwrap().is_empty());

        assert!(store.delete_review(&review.id).await.unwrap());
        assert!(!store.delete_review(&review.id).await.unwrap());
        assert!(store.get_review(&review.id).await.unwrap().is_none());

        assert!(store.delete_session(&session.id).await.unwrap());
        assert!(store.get_session(&session.id).await.unwrap().is_none());
        assert!(!store.delete_session(&session.id).await.unwrap());
    }
}

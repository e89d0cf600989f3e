// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Record store for cards, items, review sessions and reviews.
//!
//! The review core only needs basic create/read/update/delete plus one atomic
//! multi-record [`RecordStore::commit`]. Two implementations are provided:
//!
//! - [`SqliteStore`]: SQLite-backed persistence, one transaction per commit
//! - [`MemoryStore`]: in-process tables with copy-on-commit and fault injection
//!
//! # Example
//!
//! ```rust,ignore
//! use recall::store::{CommitBatch, RecordStore, SqliteStore};
//!
//! let store = SqliteStore::open_at(Path::new("recall.db"))?;
//! let mut batch = CommitBatch::new();
//! batch.update_item(item);
//! store.commit(batch).await?;
//! ```

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::types::{Card, Item, Review, ReviewSession, SessionStatus};

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SCHEMA_VERSION};

/// Store result alias.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared store handle.
pub type SharedStore = Arc<dyn RecordStore>;

/// One write inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a new review.
    CreateReview(Review),
    /// Overwrite an existing item. Fails if the item no longer exists.
    UpdateItem(Item),
    /// Write the session's status and end time, provided the stored status
    /// still equals `expected`.
    FinalizeSession {
        session: ReviewSession,
        expected: SessionStatus,
    },
}

impl WriteOp {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            WriteOp::CreateReview(_) => "create_review",
            WriteOp::UpdateItem(_) => "update_item",
            WriteOp::FinalizeSession { .. } => "finalize_session",
        }
    }
}

/// A heterogeneous batch of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitBatch {
    ops: Vec<WriteOp>,
}

impl CommitBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn create_review(&mut self, review: Review) {
        self.push(WriteOp::CreateReview(review));
    }

    pub fn update_item(&mut self, item: Item) {
        self.push(WriteOp::UpdateItem(item));
    }

    pub fn finalize_session(&mut self, session: ReviewSession, expected: SessionStatus) {
        self.push(WriteOp::FinalizeSession { session, expected });
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Persistence consumed by the review core.
///
/// Lookups return `Ok(None)` for missing records; updates of missing records
/// fail with [`StoreError::NotFound`]. Deletes report whether anything was removed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Cards
    async fn create_card(&self, card: &Card) -> StoreResult<()>;
    async fn get_card(&self, id: &str) -> StoreResult<Option<Card>>;
    async fn list_cards(&self) -> StoreResult<Vec<Card>>;
    async fn update_card(&self, card: &Card) -> StoreResult<()>;
    /// Deleting a card also deletes the items that track it.
    async fn delete_card(&self, id: &str) -> StoreResult<bool>;

    // Items
    /// Fails with `Conflict` if the reviewer already tracks the card and with
    /// `NotFound` if the card does not exist.
    async fn create_item(&self, item: &Item) -> StoreResult<()>;
    async fn get_item(&self, id: &str) -> StoreResult<Option<Item>>;
    async fn find_item(&self, reviewer_id: &str, card_id: &str) -> StoreResult<Option<Item>>;
    async fn list_items(&self, reviewer_id: &str) -> StoreResult<Vec<Item>>;
    /// Items with `next_available <= as_of`, soonest first.
    async fn due_items(&self, reviewer_id: &str, as_of: DateTime<Utc>) -> StoreResult<Vec<Item>>;
    async fn delete_item(&self, id: &str) -> StoreResult<bool>;

    // Review sessions
    async fn create_session(&self, session: &ReviewSession) -> StoreResult<()>;
    async fn get_session(&self, id: &str) -> StoreResult<Option<ReviewSession>>;
    /// Most recently started first.
    async fn list_sessions(&self) -> StoreResult<Vec<ReviewSession>>;
    async fn delete_session(&self, id: &str) -> StoreResult<bool>;

    // Reviews
    async fn get_review(&self, id: &str) -> StoreResult<Option<Review>>;
    async fn reviews_for_session(&self, session_id: &str) -> StoreResult<Vec<Review>>;
    async fn reviews_for_item(&self, item_id: &str) -> StoreResult<Vec<Review>>;
    /// Administrative removal.
    async fn delete_review(&self, id: &str) -> StoreResult<bool>;

    /// Apply every write in `batch` or none of them.
    async fn commit(&self, batch: CommitBatch) -> StoreResult<()>;
}

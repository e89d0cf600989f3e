// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Review session lifecycle.
//!
//! A session is created `STARTED` over a fixed list of items and ends exactly
//! once, as `COMPLETE` or `CANCELLED`. Ending a session writes every review,
//! every item transition and the session's own status in one store commit.

use std::collections::HashSet;
use std::sync::Arc;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::{RecordKind, ReviewError, StoreError};
use crate::srs::{Outcome, Scheduler, StageTable, Streak, SystemClock};
use crate::store::{CommitBatch, SharedStore};
use crate::types::{
    generate_id, Item, ItemId, ItemWithCard, Review, ReviewSession, SessionStatus,
};

#[cfg(feature = "telemetry")]
use crate::telemetry::{CommitSpan, GLOBAL_METRICS};

use super::queue::SessionQueue;
use super::types::{BoutRecord, ReviewConfig, SessionSummary, SummaryRow};

/// Service result alias.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Entry point for scheduling items and running review sessions.
pub struct SessionService {
    store: SharedStore,
    scheduler: Scheduler,
    config: ReviewConfig,
}

impl SessionService {
    /// Create a service with the default stage table and the system clock.
    pub fn new(store: SharedStore) -> Self {
        let scheduler = Scheduler::new(StageTable::default(), Arc::new(SystemClock));
        Self::with_scheduler(store, scheduler, ReviewConfig::default())
    }

    /// Create with a custom scheduler and configuration.
    pub fn with_scheduler(store: SharedStore, scheduler: Scheduler, config: ReviewConfig) -> Self {
        Self {
            store,
            scheduler,
            config,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Start tracking a card for the configured reviewer.
    ///
    /// The stage is clamped to the table and defaults to 0 (due immediately).
    #[instrument(skip(self), fields(reviewer = %self.config.reviewer_id))]
    pub async fn add_item(&self, card_id: &str, stage: Option<i64>) -> ReviewResult<Item> {
        if self.store.get_card(card_id).await?.is_none() {
            return Err(ReviewError::not_found(RecordKind::Card, card_id));
        }

        let stage = self.scheduler.stages().clamp(stage.unwrap_or(0));
        let next_available = self.scheduler.schedule(stage as i64);
        let item = Item::new(&self.config.reviewer_id, card_id, stage, next_available);
        self.store.create_item(&item).await?;

        info!(item_id = %item.id, stage, "item added");
        Ok(item)
    }

    /// Items due at or before `as_of`, soonest first.
    #[instrument(skip(self))]
    pub async fn get_due_items(&self, as_of: DateTime<Utc>) -> ReviewResult<Vec<Item>> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let items = self
            .store
            .due_items(&self.config.reviewer_id, as_of)
            .await?;
        debug!(count = items.len(), "due items loaded");

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("session.service.get_due_items", start.elapsed());

        Ok(items)
    }

    /// Create a `STARTED` session over the given items.
    ///
    /// Duplicate ids are collapsed, keeping the first occurrence.
    #[instrument(skip(self, item_ids), fields(requested = item_ids.len()))]
    pub async fn create_session(&self, item_ids: Vec<ItemId>) -> ReviewResult<ReviewSession> {
        if item_ids.is_empty() {
            return Err(ReviewError::InvalidInput(
                "a review session needs at least one item".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(item_ids.len());
        let item_ids: Vec<ItemId> = item_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        for id in &item_ids {
            if self.store.get_item(id).await?.is_none() {
                return Err(ReviewError::not_found(RecordKind::Item, id));
            }
        }

        let session = ReviewSession::new(item_ids, self.scheduler.now());
        self.store.create_session(&session).await?;

        info!(session_id = %session.id, items = session.item_ids.len(), "session started");
        Ok(session)
    }

    /// Create a session over the reviewer's currently due items.
    ///
    /// Takes at most the configured number of items, soonest due first.
    /// Returns `None` when nothing is due.
    pub async fn start_due_session(
        &self,
        as_of: DateTime<Utc>,
    ) -> ReviewResult<Option<(ReviewSession, SessionQueue)>> {
        let due = self.get_due_items(as_of).await?;
        if due.is_empty() {
            return Ok(None);
        }

        let ids = due
            .into_iter()
            .take(self.config.max_items_per_session.max(1))
            .map(|item| item.id)
            .collect();
        let session = self.create_session(ids).await?;
        let queue = self.start_queue(&session.id).await?;
        Ok(Some((session, queue)))
    }

    /// Build a shuffled queue for a `STARTED` session.
    #[instrument(skip(self))]
    pub async fn start_queue(&self, session_id: &str) -> ReviewResult<SessionQueue> {
        let session = self.load_session(session_id).await?;
        if session.is_terminal() {
            return Err(ReviewError::transition(format!(
                "session {} is already {}",
                session.id, session.status
            )));
        }

        let mut entries = Vec::with_capacity(session.item_ids.len());
        for item_id in &session.item_ids {
            let item = self
                .store
                .get_item(item_id)
                .await?
                .ok_or_else(|| ReviewError::not_found(RecordKind::Item, item_id))?;
            let card = self
                .store
                .get_card(&item.card_id)
                .await?
                .ok_or_else(|| ReviewError::not_found(RecordKind::Card, &item.card_id))?;
            entries.push(ItemWithCard { item, card });
        }

        Ok(SessionQueue::new(session.id, entries, self.scheduler.clock()))
    }

    /// Finish a session normally.
    pub async fn complete_session(
        &self,
        session_id: &str,
        ended_at: Option<DateTime<Utc>>,
        bouts: &[BoutRecord],
    ) -> ReviewResult<ReviewSession> {
        self.finish(session_id, SessionStatus::Complete, ended_at, bouts)
            .await
    }

    /// Abandon a session, still recording whatever was reviewed.
    pub async fn cancel_session(
        &self,
        session_id: &str,
        ended_at: Option<DateTime<Utc>>,
        bouts: &[BoutRecord],
    ) -> ReviewResult<ReviewSession> {
        self.finish(session_id, SessionStatus::Cancelled, ended_at, bouts)
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> ReviewResult<ReviewSession> {
        self.load_session(session_id).await
    }

    pub async fn list_sessions(&self) -> ReviewResult<Vec<ReviewSession>> {
        Ok(self.store.list_sessions().await?)
    }

    /// Reviews of a session joined with card fronts and current item streaks.
    #[instrument(skip(self))]
    pub async fn session_summary(&self, session_id: &str) -> ReviewResult<SessionSummary> {
        let session = self.load_session(session_id).await?;
        let reviews = self.store.reviews_for_session(session_id).await?;

        let mut rows = Vec::with_capacity(reviews.len());
        for review in reviews {
            let card_front = self
                .store
                .get_card(&review.card_id)
                .await?
                .map(|card| card.front);
            let item = self.store.get_item(&review.item_id).await?;
            rows.push(SummaryRow {
                current_streak: item.as_ref().map(|i| i.current_streak),
                max_streak: item.as_ref().map(|i| i.max_streak),
                card_front,
                review,
            });
        }

        Ok(SessionSummary { session, rows })
    }

    #[instrument(skip(self, bouts), fields(bouts = bouts.len()))]
    async fn finish(
        &self,
        session_id: &str,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
        bouts: &[BoutRecord],
    ) -> ReviewResult<ReviewSession> {
        let session = self.load_session(session_id).await?;
        if session.is_terminal() {
            return Err(ReviewError::transition(format!(
                "session {} is already {}",
                session.id, session.status
            )));
        }

        let kind = match status {
            SessionStatus::Complete => "complete",
            _ => "cancel",
        };

        #[cfg(feature = "telemetry")]
        let span = CommitSpan::start(kind, &session.id, bouts.len());

        let result = self.commit_bouts(&session, status, ended_at, bouts).await;

        #[cfg(feature = "telemetry")]
        span.finish_with_result(&result);

        match &result {
            Ok(done) => info!(session_id = %done.id, kind, "session finished"),
            Err(e) => warn!(session_id = %session.id, kind, error = %e, "session commit failed"),
        }
        result
    }

    async fn commit_bouts(
        &self,
        session: &ReviewSession,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
        bouts: &[BoutRecord],
    ) -> ReviewResult<ReviewSession> {
        let members: HashSet<&str> = session.item_ids.iter().map(String::as_str).collect();
        let mut seen = HashSet::with_capacity(bouts.len());
        let mut batch = CommitBatch::new();
        let now = self.scheduler.now();

        for bout in bouts {
            if !members.contains(bout.item_id.as_str()) {
                return Err(ReviewError::InvalidInput(format!(
                    "item {} is not part of session {}",
                    bout.item_id, session.id
                )));
            }
            if !seen.insert(bout.item_id.as_str()) {
                return Err(ReviewError::InvalidInput(format!(
                    "item {} has more than one bout",
                    bout.item_id
                )));
            }

            let item = self.store.get_item(&bout.item_id).await?.ok_or_else(|| {
                ReviewError::CommitFailure(format!("item {} no longer exists", bout.item_id))
            })?;

            let (review, updated) = self.transition(session, item, bout, now);
            batch.create_review(review);
            batch.update_item(updated);
        }

        let ended_at = ended_at.unwrap_or(now);
        let finalized = session.finalized(status, ended_at);
        batch.finalize_session(finalized.clone(), SessionStatus::Started);

        let reviews = bouts.len() as u64;
        self.store.commit(batch).await.map_err(|e| match e {
            StoreError::Conflict(msg) => ReviewError::transition(msg),
            other => ReviewError::CommitFailure(other.to_string()),
        })?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_written(reviews, reviews);
        debug!(reviews, "bouts committed");

        Ok(finalized)
    }

    /// Review and updated item for one bout.
    fn transition(
        &self,
        session: &ReviewSession,
        item: Item,
        bout: &BoutRecord,
        now: DateTime<Utc>,
    ) -> (Review, Item) {
        let outcome = Outcome::incorrect(bout.times_incorrect);
        let advance = self
            .scheduler
            .advance(bout.starting_stage as i64, outcome);
        let streak = Streak::new(bout.current_streak, bout.max_streak).apply(outcome);

        let review = Review {
            id: generate_id(),
            created_at: now,
            session_id: session.id.clone(),
            item_id: item.id.clone(),
            card_id: item.card_id.clone(),
            starting_stage: bout.starting_stage,
            ending_stage: advance.stage,
            seconds_elapsed: bout.seconds_elapsed,
            times_incorrect: bout.times_incorrect,
        };

        // times_correct counts every reviewed bout, including ones with misses
        let updated = Item {
            current_stage: advance.stage,
            next_available: advance.next_available,
            times_reviewed: item.times_reviewed.saturating_add(1),
            times_correct: item.times_correct.saturating_add(1),
            times_incorrect: item.times_incorrect.saturating_add(bout.times_incorrect),
            current_streak: streak.current,
            max_streak: streak.max,
            ..item
        };

        (review, updated)
    }

    async fn load_session(&self, session_id: &str) -> ReviewResult<ReviewSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| ReviewError::not_found(RecordKind::Session, session_id))
    }
}

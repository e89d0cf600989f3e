// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Live working set for one review session.
//!
//! The queue holds the ids still to be reviewed plus one [`Bout`] per item.
//! The front of the queue is the item being presented. Operations act on that
//! item and are synchronous; nothing here touches the record store.
//!
//! Per-pass sub-status:
//!
//! ```text
//!              submit_guess (match)
//!   Unstarted ─────────────────────▶ AnsweredCorrect ──proceed──▶ removed
//!      │  ▲    submit_guess (miss)
//!      │  └──────retry────────┐
//!      │                      │
//!      ├─────────────────▶ AnsweredIncorrect ──proceed──▶ tail, Unstarted
//!      │      skip
//!      └─────────────────▶ Skipped ───────────proceed──▶ tail, Unstarted
//! ```

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::error::ReviewError;
use crate::srs::SharedClock;
use crate::types::{ItemId, ItemWithCard, SessionId};

use super::types::{Bout, BoutRecord, BoutStatus, QueueProgress};

/// In-memory review queue for one session.
pub struct SessionQueue {
    session_id: SessionId,
    /// Initial shuffled order, used to report bouts deterministically.
    order: Vec<ItemId>,
    remaining: VecDeque<ItemId>,
    bouts: HashMap<ItemId, Bout>,
    clock: SharedClock,
    presented_at: DateTime<Utc>,
}

impl SessionQueue {
    /// Build a queue in a uniformly shuffled order.
    pub fn new(session_id: impl Into<SessionId>, entries: Vec<ItemWithCard>, clock: SharedClock) -> Self {
        Self::with_rng(session_id, entries, clock, &mut rand::thread_rng())
    }

    /// Build a queue shuffled with the given generator.
    pub fn with_rng<R: Rng + ?Sized>(
        session_id: impl Into<SessionId>,
        entries: Vec<ItemWithCard>,
        clock: SharedClock,
        rng: &mut R,
    ) -> Self {
        let mut bouts = HashMap::with_capacity(entries.len());
        let mut order = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.item.id.clone();
            if bouts.contains_key(&id) {
                continue;
            }
            order.push(id.clone());
            bouts.insert(id, Bout::new(entry));
        }
        order.shuffle(rng);

        let presented_at = clock.now();
        let session_id = session_id.into();
        debug!(session_id = %session_id, items = order.len(), "queue built");

        Self {
            session_id,
            remaining: order.iter().cloned().collect(),
            order,
            bouts,
            clock,
            presented_at,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The bout currently presented, if any.
    pub fn current(&self) -> Option<&Bout> {
        self.remaining.front().and_then(|id| self.bouts.get(id))
    }

    /// Look up any bout in this session.
    pub fn bout(&self, item_id: &str) -> Option<&Bout> {
        self.bouts.get(item_id)
    }

    /// Ids still to be reviewed, front first.
    pub fn remaining(&self) -> impl Iterator<Item = &ItemId> {
        self.remaining.iter()
    }

    pub fn progress(&self) -> QueueProgress {
        QueueProgress {
            total: self.order.len(),
            completed: self.order.len() - self.remaining.len(),
            remaining: self.remaining.len(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Compare a guess against the current card's back.
    ///
    /// Returns whether the guess was correct.
    pub fn submit_guess(&mut self, guess: &str) -> Result<bool, ReviewError> {
        let bout = self.current_in(BoutStatus::Unstarted, "submit a guess")?;
        let correct = bout.card.matches(guess);
        let next = bout.guessed(guess, correct, self.elapsed_seconds());
        trace!(item_id = %next.item.id, correct, "guess submitted");
        self.replace(next);
        Ok(correct)
    }

    /// Present the current item again after an incorrect answer.
    pub fn retry(&mut self) -> Result<(), ReviewError> {
        let next = self
            .current_in(BoutStatus::AnsweredIncorrect, "retry")?
            .retried();
        self.replace(next);
        self.presented_at = self.clock.now();
        Ok(())
    }

    /// Skip the current item without answering.
    pub fn skip(&mut self) -> Result<(), ReviewError> {
        let next = self
            .current_in(BoutStatus::Unstarted, "skip")?
            .skipped(self.elapsed_seconds());
        self.replace(next);
        Ok(())
    }

    /// Move past the current item.
    ///
    /// A correct item leaves the queue; an incorrect or skipped one goes to
    /// the tail for another pass.
    pub fn proceed(&mut self) -> Result<(), ReviewError> {
        let bout = self.front()?;
        match bout.status {
            BoutStatus::AnsweredCorrect => {
                let id = bout.item.id.clone();
                self.remaining.pop_front();
                debug!(item_id = %id, "item resolved");
            }
            BoutStatus::AnsweredIncorrect | BoutStatus::Skipped => {
                let next = bout.requeued();
                if let Some(id) = self.remaining.pop_front() {
                    self.remaining.push_back(id);
                }
                debug!(item_id = %next.item.id, pass = next.passes, "item requeued");
                self.replace(next);
            }
            BoutStatus::Unstarted => {
                return Err(ReviewError::transition(
                    "cannot continue from an unanswered item",
                ));
            }
        }
        self.presented_at = self.clock.now();
        Ok(())
    }

    /// Commit inputs for every item the reviewer has interacted with.
    pub fn bout_records(&self) -> Vec<BoutRecord> {
        self.order
            .iter()
            .filter_map(|id| self.bouts.get(id))
            .filter(|bout| bout.is_touched())
            .map(Bout::record)
            .collect()
    }

    fn front(&self) -> Result<&Bout, ReviewError> {
        self.current()
            .ok_or_else(|| ReviewError::transition("review queue is exhausted"))
    }

    fn current_in(&self, expected: BoutStatus, action: &str) -> Result<&Bout, ReviewError> {
        let bout = self.front()?;
        if bout.status != expected {
            return Err(ReviewError::transition(format!(
                "cannot {} while item is {}",
                action, bout.status
            )));
        }
        Ok(bout)
    }

    fn replace(&mut self, bout: Bout) {
        self.bouts.insert(bout.item.id.clone(), bout);
    }

    /// Whole seconds since the current item was presented, rounded up.
    fn elapsed_seconds(&self) -> u64 {
        let millis = (self.clock.now() - self.presented_at)
            .num_milliseconds()
            .max(0) as u64;
        millis.div_ceil(1000)
    }
}

impl std::fmt::Debug for SessionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionQueue")
            .field("session_id", &self.session_id)
            .field("remaining", &self.remaining)
            .field("presented_at", &self.presented_at)
            .finish_non_exhaustive()
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session types: per-item bouts, commit inputs and the summary view.

use serde::{Deserialize, Serialize};

use crate::types::{
    Card, CardId, Item, ItemId, ItemWithCard, Review, ReviewSession, DEFAULT_REVIEWER,
};

/// Sub-status of an item within the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoutStatus {
    Unstarted,
    AnsweredCorrect,
    AnsweredIncorrect,
    Skipped,
}

impl BoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::AnsweredCorrect => "answered_correct",
            Self::AnsweredIncorrect => "answered_incorrect",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for BoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item's in-session interaction, possibly spanning several passes.
///
/// Bouts are values: every transition builds a new `Bout` which replaces the
/// previous one in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Bout {
    pub item: Item,
    pub card: Card,
    pub status: BoutStatus,
    /// Whole seconds spent on this item across all passes.
    pub seconds_elapsed: u64,
    pub times_incorrect: u32,
    /// Number of times the item has been presented, starting at 1.
    pub passes: u32,
    /// Guesses plus skips.
    pub attempts: u32,
    pub last_guess: Option<String>,
}

impl Bout {
    pub fn new(entry: ItemWithCard) -> Self {
        Self {
            item: entry.item,
            card: entry.card,
            status: BoutStatus::Unstarted,
            seconds_elapsed: 0,
            times_incorrect: 0,
            passes: 1,
            attempts: 0,
            last_guess: None,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item.id
    }

    /// Whether the reviewer has done anything with this item yet.
    pub fn is_touched(&self) -> bool {
        self.attempts > 0
    }

    pub(crate) fn guessed(&self, guess: &str, correct: bool, seconds: u64) -> Self {
        Self {
            status: if correct {
                BoutStatus::AnsweredCorrect
            } else {
                BoutStatus::AnsweredIncorrect
            },
            seconds_elapsed: self.seconds_elapsed.saturating_add(seconds),
            times_incorrect: if correct {
                self.times_incorrect
            } else {
                self.times_incorrect.saturating_add(1)
            },
            attempts: self.attempts.saturating_add(1),
            last_guess: Some(guess.to_string()),
            ..self.clone()
        }
    }

    pub(crate) fn skipped(&self, seconds: u64) -> Self {
        Self {
            status: BoutStatus::Skipped,
            seconds_elapsed: self.seconds_elapsed.saturating_add(seconds),
            attempts: self.attempts.saturating_add(1),
            ..self.clone()
        }
    }

    pub(crate) fn retried(&self) -> Self {
        Self {
            status: BoutStatus::Unstarted,
            last_guess: None,
            ..self.clone()
        }
    }

    pub(crate) fn requeued(&self) -> Self {
        Self {
            status: BoutStatus::Unstarted,
            passes: self.passes.saturating_add(1),
            last_guess: None,
            ..self.clone()
        }
    }

    /// Commit input for this bout.
    pub fn record(&self) -> BoutRecord {
        BoutRecord {
            item_id: self.item.id.clone(),
            card_id: self.card.id.clone(),
            seconds_elapsed: self.seconds_elapsed,
            times_incorrect: self.times_incorrect,
            starting_stage: self.item.current_stage,
            current_streak: self.item.current_streak,
            max_streak: self.item.max_streak,
        }
    }
}

/// Accumulated per-item result handed to the terminal commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoutRecord {
    pub item_id: ItemId,
    pub card_id: CardId,
    pub seconds_elapsed: u64,
    pub times_incorrect: u32,
    /// Item stage when the session started.
    pub starting_stage: u32,
    /// Item streaks before the session.
    pub current_streak: u32,
    pub max_streak: u32,
}

/// Queue progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueProgress {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

/// Review lifecycle configuration.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Reviewer whose items are scheduled.
    pub reviewer_id: String,
    /// Cap on items pulled into one session.
    pub max_items_per_session: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            reviewer_id: DEFAULT_REVIEWER.to_string(),
            max_items_per_session: 50,
        }
    }
}

/// One line of a session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub review: Review,
    /// Front of the card, if the card still exists.
    pub card_front: Option<String>,
    /// Streaks as currently stored on the item, if the item still exists.
    pub current_streak: Option<u32>,
    pub max_streak: Option<u32>,
}

impl SummaryRow {
    pub fn is_clean(&self) -> bool {
        self.review.times_incorrect == 0
    }
}

/// Finished-session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session: ReviewSession,
    pub rows: Vec<SummaryRow>,
}

impl SessionSummary {
    /// Fraction of reviews with no incorrect answers, in `[0, 1]`.
    ///
    /// An empty session scores 0.
    pub fn percent_correct(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let clean = self.rows.iter().filter(|row| row.is_clean()).count();
        clean as f64 / self.rows.len() as f64
    }

    pub fn total_seconds(&self) -> u64 {
        self.rows.iter().map(|row| row.review.seconds_elapsed).sum()
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

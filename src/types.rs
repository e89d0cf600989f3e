// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core record types for the recall reviewer.
//!
//! These are the persisted shapes shared by the scheduler, the session
//! lifecycle and every record store: cards, items, review sessions and reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Card identifier.
pub type CardId = String;

/// Item identifier.
pub type ItemId = String;

/// Review session identifier.
pub type SessionId = String;

/// Review identifier.
pub type ReviewId = String;

/// Reviewer the implicit single-user setup runs as.
pub const DEFAULT_REVIEWER: &str = "local";

/// Generate a new record identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Card
// ============================================================================

/// Immutable flashcard content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            front: front.into(),
            back: back.into(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether a guess matches the back of the card.
    ///
    /// Comparison is exact after trimming surrounding whitespace and
    /// lowercasing both sides.
    pub fn matches(&self, guess: &str) -> bool {
        normalize_answer(guess) == normalize_answer(&self.back)
    }
}

fn normalize_answer(text: &str) -> String {
    text.trim().to_lowercase()
}

// ============================================================================
// Item
// ============================================================================

/// A reviewer's scheduling record for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub reviewer_id: String,
    pub card_id: CardId,
    /// Index into the stage table.
    pub current_stage: u32,
    /// Cached from `current_stage` at the last transition.
    pub next_available: DateTime<Utc>,
    #[serde(default)]
    pub times_reviewed: u32,
    #[serde(default)]
    pub times_correct: u32,
    #[serde(default)]
    pub times_incorrect: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub max_streak: u32,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        reviewer_id: impl Into<String>,
        card_id: impl Into<CardId>,
        current_stage: u32,
        next_available: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(),
            reviewer_id: reviewer_id.into(),
            card_id: card_id.into(),
            current_stage,
            next_available,
            times_reviewed: 0,
            times_correct: 0,
            times_incorrect: 0,
            current_streak: 0,
            max_streak: 0,
            created_at: Utc::now(),
        }
    }

    /// Check if the item is due at `as_of`.
    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.next_available <= as_of
    }
}

/// An item joined with its card, as handed to a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWithCard {
    pub item: Item,
    pub card: Card,
}

// ============================================================================
// Review sessions
// ============================================================================

/// Lifecycle status of a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Started,
    Complete,
    Cancelled,
}

impl SessionStatus {
    /// No transition is permitted out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Complete => "COMPLETE",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STARTED" => Some(Self::Started),
            "COMPLETE" => Some(Self::Complete),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded batch of items selected for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub item_ids: Vec<ItemId>,
}

impl ReviewSession {
    pub fn new(item_ids: Vec<ItemId>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            started_at,
            ended_at: None,
            status: SessionStatus::Started,
            item_ids,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The terminal form of this session, as written by a commit.
    pub fn finalized(&self, status: SessionStatus, ended_at: DateTime<Utc>) -> Self {
        Self {
            status,
            ended_at: Some(ended_at),
            ..self.clone()
        }
    }
}

// ============================================================================
// Reviews
// ============================================================================

/// Historical outcome of one item within one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub created_at: DateTime<Utc>,
    pub session_id: SessionId,
    pub item_id: ItemId,
    pub card_id: CardId,
    pub starting_stage: u32,
    pub ending_stage: u32,
    pub seconds_elapsed: u64,
    pub times_incorrect: u32,
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SQLite-based record store.

use std::path::{Path, PathBuf};
#[cfg(feature = "telemetry")]
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{RecordKind, StoreError};
use crate::types::{Card, Item, Review, ReviewSession, SessionStatus};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::{CommitBatch, RecordStore, StoreResult, WriteOp};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

const CARD_COLUMNS: &str = "id, front, back, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, reviewer_id, card_id, current_stage, next_available, \
     times_reviewed, times_correct, times_incorrect, current_streak, max_streak, created_at";

const REVIEW_COLUMNS: &str = "id, created_at, session_id, item_id, card_id, starting_stage, \
     ending_stage, seconds_elapsed, times_incorrect";

/// Record store using SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create a database at a specific path.
    pub fn open_at(db_path: &Path) -> StoreResult<Self> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self::from_connection(conn, Some(db_path.to_path_buf()))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.sqlite.open", start.elapsed());

        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Get the database path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Initialize the database schema.
fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            notes TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            reviewer_id TEXT NOT NULL,
            card_id TEXT NOT NULL,
            current_stage INTEGER NOT NULL DEFAULT 0,
            next_available INTEGER NOT NULL,
            times_reviewed INTEGER NOT NULL DEFAULT 0,
            times_correct INTEGER NOT NULL DEFAULT 0,
            times_incorrect INTEGER NOT NULL DEFAULT 0,
            current_streak INTEGER NOT NULL DEFAULT 0,
            max_streak INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            UNIQUE (reviewer_id, card_id),
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS review_sessions (
            id TEXT PRIMARY KEY,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            status TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_items (
            session_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (session_id, item_id),
            FOREIGN KEY (session_id) REFERENCES review_sessions(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            session_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            card_id TEXT NOT NULL,
            starting_stage INTEGER NOT NULL,
            ending_stage INTEGER NOT NULL,
            seconds_elapsed INTEGER NOT NULL,
            times_incorrect INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_items_next_available ON items(reviewer_id, next_available);
        CREATE INDEX IF NOT EXISTS idx_reviews_session_id ON reviews(session_id);
        CREATE INDEX IF NOT EXISTS idx_reviews_item_id ON reviews(item_id);
        "#,
    )?;

    let current_version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    if current_version.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            params![SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn from_millis(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        front: row.get(1)?,
        back: row.get(2)?,
        notes: row.get(3)?,
        created_at: from_millis(4, row.get(4)?)?,
        updated_at: from_millis(5, row.get(5)?)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        reviewer_id: row.get(1)?,
        card_id: row.get(2)?,
        current_stage: row.get(3)?,
        next_available: from_millis(4, row.get(4)?)?,
        times_reviewed: row.get(5)?,
        times_correct: row.get(6)?,
        times_incorrect: row.get(7)?,
        current_streak: row.get(8)?,
        max_streak: row.get(9)?,
        created_at: from_millis(10, row.get(10)?)?,
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        created_at: from_millis(1, row.get(1)?)?,
        session_id: row.get(2)?,
        item_id: row.get(3)?,
        card_id: row.get(4)?,
        starting_stage: row.get(5)?,
        ending_stage: row.get(6)?,
        seconds_elapsed: row.get::<_, i64>(7)? as u64,
        times_incorrect: row.get(8)?,
    })
}

/// Read session rows plus their item ids.
fn load_session(conn: &Connection, id: &str) -> StoreResult<Option<ReviewSession>> {
    let header = conn
        .query_row(
            "SELECT id, started_at, ended_at, status FROM review_sessions WHERE id = ?",
            params![id],
            |row| {
                let ended_at: Option<i64> = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    from_millis(1, row.get(1)?)?,
                    ended_at.map(|ms| from_millis(2, ms)).transpose()?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, started_at, ended_at, status)) = header else {
        return Ok(None);
    };

    let status = SessionStatus::parse(&status)
        .ok_or_else(|| StoreError::Backend(format!("Unknown session status: {}", status)))?;

    let mut stmt = conn.prepare(
        "SELECT item_id FROM session_items WHERE session_id = ? ORDER BY position ASC",
    )?;
    let item_ids = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(ReviewSession {
        id,
        started_at,
        ended_at,
        status,
        item_ids,
    }))
}

fn insert_review(tx: &Transaction<'_>, review: &Review) -> StoreResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO reviews ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            REVIEW_COLUMNS
        ),
        params![
            review.id,
            to_millis(review.created_at),
            review.session_id,
            review.item_id,
            review.card_id,
            review.starting_stage,
            review.ending_stage,
            review.seconds_elapsed as i64,
            review.times_incorrect,
        ],
    )?;
    Ok(())
}

fn write_item(conn: &Connection, item: &Item) -> StoreResult<()> {
    let rows = conn.execute(
        r#"
        UPDATE items SET
            current_stage = ?, next_available = ?, times_reviewed = ?, times_correct = ?,
            times_incorrect = ?, current_streak = ?, max_streak = ?
        WHERE id = ?
        "#,
        params![
            item.current_stage,
            to_millis(item.next_available),
            item.times_reviewed,
            item.times_correct,
            item.times_incorrect,
            item.current_streak,
            item.max_streak,
            item.id,
        ],
    )?;

    if rows == 0 {
        return Err(StoreError::not_found(RecordKind::Item, &item.id));
    }
    Ok(())
}

fn finalize_session(
    tx: &Transaction<'_>,
    session: &ReviewSession,
    expected: SessionStatus,
) -> StoreResult<()> {
    let rows = tx.execute(
        "UPDATE review_sessions SET status = ?, ended_at = ? WHERE id = ? AND status = ?",
        params![
            session.status.as_str(),
            session.ended_at.map(to_millis),
            session.id,
            expected.as_str(),
        ],
    )?;

    if rows > 0 {
        return Ok(());
    }

    let stored: Option<String> = tx
        .query_row(
            "SELECT status FROM review_sessions WHERE id = ?",
            params![session.id],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        None => Err(StoreError::not_found(RecordKind::Session, &session.id)),
        Some(status) => Err(StoreError::Conflict(format!(
            "session {} is {}, expected {}",
            session.id, status, expected
        ))),
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_card(&self, card: &Card) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT INTO cards ({}) VALUES (?, ?, ?, ?, ?, ?)", CARD_COLUMNS),
            params![
                card.id,
                card.front,
                card.back,
                card.notes,
                to_millis(card.created_at),
                to_millis(card.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn get_card(&self, id: &str) -> StoreResult<Option<Card>> {
        let conn = self.conn.lock().await;
        let card = conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?", CARD_COLUMNS),
                params![id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    async fn list_cards(&self) -> StoreResult<Vec<Card>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cards ORDER BY created_at ASC",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map([], card_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    async fn update_card(&self, card: &Card) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE cards SET front = ?, back = ?, notes = ?, updated_at = ? WHERE id = ?",
            params![
                card.front,
                card.back,
                card.notes,
                to_millis(card.updated_at),
                card.id,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::not_found(RecordKind::Card, &card.id));
        }
        Ok(())
    }

    async fn delete_card(&self, id: &str) -> StoreResult<bool> {
        // Items are deleted via CASCADE
        let conn = self.conn.lock().await;
        let rows = conn.execute("DELETE FROM cards WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    async fn create_item(&self, item: &Item) -> StoreResult<()> {
        let conn = self.conn.lock().await;

        let card_exists: Option<i64> = conn
            .query_row("SELECT 1 FROM cards WHERE id = ?", params![item.card_id], |row| {
                row.get(0)
            })
            .optional()?;
        if card_exists.is_none() {
            return Err(StoreError::not_found(RecordKind::Card, &item.card_id));
        }

        conn.execute(
            &format!(
                "INSERT INTO items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ITEM_COLUMNS
            ),
            params![
                item.id,
                item.reviewer_id,
                item.card_id,
                item.current_stage,
                to_millis(item.next_available),
                item.times_reviewed,
                item.times_correct,
                item.times_incorrect,
                item.current_streak,
                item.max_streak,
                to_millis(item.created_at),
            ],
        )?;
        Ok(())
    }

    async fn get_item(&self, id: &str) -> StoreResult<Option<Item>> {
        let conn = self.conn.lock().await;
        let item = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS),
                params![id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    async fn find_item(&self, reviewer_id: &str, card_id: &str) -> StoreResult<Option<Item>> {
        let conn = self.conn.lock().await;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {} FROM items WHERE reviewer_id = ? AND card_id = ?",
                    ITEM_COLUMNS
                ),
                params![reviewer_id, card_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    async fn list_items(&self, reviewer_id: &str) -> StoreResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE reviewer_id = ? ORDER BY created_at ASC",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![reviewer_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn due_items(&self, reviewer_id: &str, as_of: DateTime<Utc>) -> StoreResult<Vec<Item>> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE reviewer_id = ? AND next_available <= ? \
             ORDER BY next_available ASC",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![reviewer_id, to_millis(as_of)], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.sqlite.due_items", start.elapsed());

        Ok(items)
    }

    async fn delete_item(&self, id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let rows = conn.execute("DELETE FROM items WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    async fn create_session(&self, session: &ReviewSession) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO review_sessions (id, started_at, ended_at, status) VALUES (?, ?, ?, ?)",
            params![
                session.id,
                to_millis(session.started_at),
                session.ended_at.map(to_millis),
                session.status.as_str(),
            ],
        )?;

        for (position, item_id) in session.item_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO session_items (session_id, item_id, position) VALUES (?, ?, ?)",
                params![session.id, item_id, position as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<ReviewSession>> {
        let conn = self.conn.lock().await;
        load_session(&conn, id)
    }

    async fn list_sessions(&self) -> StoreResult<Vec<ReviewSession>> {
        let conn = self.conn.lock().await;
        let ids = {
            let mut stmt =
                conn.prepare("SELECT id FROM review_sessions ORDER BY started_at DESC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = load_session(&conn, &id)? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        // Session items are deleted via CASCADE
        let conn = self.conn.lock().await;
        let rows = conn.execute("DELETE FROM review_sessions WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    async fn get_review(&self, id: &str) -> StoreResult<Option<Review>> {
        let conn = self.conn.lock().await;
        let review = conn
            .query_row(
                &format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS),
                params![id],
                review_from_row,
            )
            .optional()?;
        Ok(review)
    }

    async fn reviews_for_session(&self, session_id: &str) -> StoreResult<Vec<Review>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reviews WHERE session_id = ? ORDER BY created_at ASC, rowid ASC",
            REVIEW_COLUMNS
        ))?;
        let reviews = stmt
            .query_map(params![session_id], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    async fn reviews_for_item(&self, item_id: &str) -> StoreResult<Vec<Review>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reviews WHERE item_id = ? ORDER BY created_at ASC, rowid ASC",
            REVIEW_COLUMNS
        ))?;
        let reviews = stmt
            .query_map(params![item_id], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    async fn delete_review(&self, id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let rows = conn.execute("DELETE FROM reviews WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    async fn commit(&self, batch: CommitBatch) -> StoreResult<()> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let op_count = batch.len();
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        for (index, op) in batch.into_ops().iter().enumerate() {
            let result = match op {
                WriteOp::CreateReview(review) => insert_review(&tx, review),
                WriteOp::UpdateItem(item) => write_item(&tx, item),
                WriteOp::FinalizeSession { session, expected } => {
                    finalize_session(&tx, session, *expected)
                }
            };

            if let Err(e) = result {
                // Dropping the transaction rolls back every earlier write
                warn!(op = op.label(), index, error = %e, "commit aborted, rolling back");
                return Err(e);
            }
        }

        tx.commit()?;
        debug!(ops = op_count, "commit applied");

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.sqlite.commit", start.elapsed());

        Ok(())
    }
}

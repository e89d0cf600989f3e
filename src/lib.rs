// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! recall - spaced-repetition flashcards with timed review sessions.
//!
//! A reviewer tracks cards as items. Each item sits at a stage of a fixed
//! interval table; answering it correctly moves it up a stage and further
//! into the future, missing it moves it down. Reviews happen in sessions that
//! are committed to the record store all at once.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Records: cards, items, review sessions and reviews
//! - [`error`] - Error types and result aliases
//! - [`srs`] - Stage table, clock and the scheduling rules
//! - [`store`] - Record store trait with SQLite and in-memory backends
//! - [`session`] - Session queue state machine and the session service
//! - [`config`] - Configuration loading and merging
//! - [`telemetry`] - Tracing, metrics, and observability infrastructure
//! - [`cli`] - Rendering and the interactive review loop used by the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use recall::session::SessionService;
//! use recall::store::{RecordStore, SqliteStore};
//! use recall::types::Card;
//!
//! let store = Arc::new(SqliteStore::open_at("recall.db".as_ref())?);
//! let card = Card::new("gato", "cat");
//! store.create_card(&card).await?;
//!
//! let service = SessionService::new(store);
//! service.add_item(&card.id, None).await?;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod srs;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, RecordKind, Result, ReviewError, StoreError};
pub use session::{BoutRecord, ReviewConfig, SessionQueue, SessionService, SessionSummary};
pub use srs::{Scheduler, StageTable};
pub use store::{MemoryStore, RecordStore, SharedStore, SqliteStore};
pub use types::{Card, Item, ItemWithCard, Review, ReviewSession, SessionStatus};

/// recall version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

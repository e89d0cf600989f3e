// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Review sessions: the live queue and the persisted lifecycle.
//!
//! - **Types**: Bout, BoutRecord, SessionSummary
//! - **Queue**: in-memory per-session working set with requeue of misses and skips
//! - **Service**: session creation, queue start-up and the terminal commit
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     SessionService                        │
//! │ (create_session, start_queue, complete/cancel, summary)   │
//! └──────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌─────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │  SessionQueue   │ │    Scheduler     │ │   RecordStore    │
//! │ (bouts, timer)  │ │ (stages, clock)  │ │ (atomic commit)  │
//! └─────────────────┘ └──────────────────┘ └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use recall::session::SessionService;
//! use recall::store::SqliteStore;
//!
//! let service = SessionService::new(Arc::new(SqliteStore::open_at(path)?));
//!
//! let session = service.create_session(item_ids).await?;
//! let mut queue = service.start_queue(&session.id).await?;
//!
//! queue.submit_guess("perro")?;
//! queue.proceed()?;
//!
//! if queue.is_exhausted() {
//!     service.complete_session(&session.id, None, &queue.bout_records()).await?;
//! }
//! ```

pub mod queue;
pub mod service;
pub mod types;

pub use queue::SessionQueue;
pub use service::{ReviewResult, SessionService};
pub use types::{
    format_duration, Bout, BoutRecord, BoutStatus, QueueProgress, ReviewConfig, SessionSummary,
    SummaryRow,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let config = ReviewConfig::default();
        assert_eq!(config.reviewer_id, crate::types::DEFAULT_REVIEWER);
        assert_eq!(format_duration(75), "1:15");
    }
}

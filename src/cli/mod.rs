// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Support code for the `recall` binary.

pub mod render;
pub mod review;

use std::sync::Arc;

use crate::config::ResolvedConfig;
use crate::error::{RecordKind, ReviewError, Result};
use crate::session::{ReviewResult, SessionService};
use crate::srs::{Scheduler, SystemClock};
use crate::store::{SharedStore, SqliteStore};

pub use review::{run_review, LineSource, PromptOptions, ScriptedInput, Terminal};

/// Open the configured database and build a service over it.
pub fn open_service(config: &ResolvedConfig) -> Result<SessionService> {
    let store: SharedStore = Arc::new(SqliteStore::open_at(&config.database_path)?);
    let scheduler = Scheduler::new(config.stage_table()?, Arc::new(SystemClock));
    Ok(SessionService::with_scheduler(
        store,
        scheduler,
        config.review_config(),
    ))
}

/// Pick the id matching `needle` exactly or as a unique prefix.
pub fn resolve_id<'a, I>(kind: RecordKind, needle: &str, ids: I) -> ReviewResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut matches = Vec::new();
    for id in ids {
        if id == needle {
            return Ok(id.to_string());
        }
        if id.starts_with(needle) {
            matches.push(id);
        }
    }

    match matches.as_slice() {
        [one] => Ok(one.to_string()),
        [] => Err(ReviewError::not_found(kind, needle)),
        many => Err(ReviewError::InvalidInput(format!(
            "{} prefix '{}' matches {} records",
            kind,
            needle,
            many.len()
        ))),
    }
}

pub async fn resolve_card(service: &SessionService, needle: &str) -> ReviewResult<String> {
    let cards = service.store().list_cards().await?;
    resolve_id(RecordKind::Card, needle, cards.iter().map(|c| c.id.as_str()))
}

/// Resolve among the configured reviewer's items.
pub async fn resolve_item(service: &SessionService, needle: &str) -> ReviewResult<String> {
    let items = service
        .store()
        .list_items(&service.config().reviewer_id)
        .await?;
    resolve_id(RecordKind::Item, needle, items.iter().map(|i| i.id.as_str()))
}

pub async fn resolve_session(service: &SessionService, needle: &str) -> ReviewResult<String> {
    let sessions = service.list_sessions().await?;
    resolve_id(
        RecordKind::Session,
        needle,
        sessions.iter().map(|s| s.id.as_str()),
    )
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal rendering for cards, items, sessions and summaries.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::session::{format_duration, SessionSummary};
use crate::types::{Card, Item, ReviewSession, SessionStatus};

/// Short form of an id for tables.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// When something becomes due, relative to `now`.
pub fn relative_due(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = at - now;
    if delta.num_seconds() <= 0 {
        return "now".to_string();
    }
    let minutes = delta.num_minutes();
    if minutes < 60 {
        format!("in {}m", minutes.max(1))
    } else if minutes < 48 * 60 {
        format!("in {}h", delta.num_hours())
    } else {
        format!("in {}d", delta.num_days())
    }
}

pub fn card_line(card: &Card) -> String {
    format!(
        "{}  {} {} {}",
        short_id(&card.id).dimmed(),
        card.front.bold(),
        "→".dimmed(),
        card.back
    )
}

pub fn card_details(card: &Card, item: Option<&Item>, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", "Card".bright_blue().bold(), card.id));
    out.push_str(&format!("  Front: {}\n", card.front));
    out.push_str(&format!("  Back:  {}\n", card.back));
    if let Some(notes) = &card.notes {
        out.push_str(&format!("  Notes: {}\n", notes));
    }
    out.push_str(&format!("  Created: {}\n", card.created_at.format("%Y-%m-%d %H:%M")));
    match item {
        Some(item) => out.push_str(&item_details(item, now)),
        None => out.push_str(&format!("  {}\n", "Not in the review queue".dimmed())),
    }
    out
}

fn item_details(item: &Item, now: DateTime<Utc>) -> String {
    format!(
        "  Stage {} · due {} · reviewed {} · incorrect {} · streak {} (best {})\n",
        item.current_stage,
        relative_due(item.next_available, now),
        item.times_reviewed,
        item.times_incorrect,
        item.current_streak,
        item.max_streak,
    )
}

/// One line per item, with the card front when known.
pub fn item_line(item: &Item, front: Option<&str>, now: DateTime<Utc>) -> String {
    let due = relative_due(item.next_available, now);
    let due = if item.is_due(now) {
        due.green().to_string()
    } else {
        due.normal().to_string()
    };
    format!(
        "{}  stage {:<2} {:<8} {}",
        short_id(&item.id).dimmed(),
        item.current_stage,
        due,
        front.unwrap_or("(missing card)")
    )
}

fn status_label(status: SessionStatus) -> String {
    match status {
        SessionStatus::Started => status.as_str().yellow().to_string(),
        SessionStatus::Complete => status.as_str().green().to_string(),
        SessionStatus::Cancelled => status.as_str().red().to_string(),
    }
}

pub fn session_line(session: &ReviewSession) -> String {
    format!(
        "{}  {}  {:>3} items  {}",
        short_id(&session.id).dimmed(),
        session.started_at.format("%Y-%m-%d %H:%M"),
        session.item_ids.len(),
        status_label(session.status)
    )
}

/// Table of a finished session's reviews.
pub fn summary_table(summary: &SessionSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}  {}\n",
        "Review summary".bright_blue().bold(),
        short_id(&summary.session.id),
        status_label(summary.session.status)
    ));
    out.push_str(&format!(
        "{:<24} {:>5} {:>5} {:>8} {:>6} {:>7} {:>5}\n",
        "Card", "Start", "End", "Time", "Wrong", "Streak", "Best"
    ));

    for row in &summary.rows {
        let front = row.card_front.as_deref().unwrap_or("(deleted card)");
        let streak = |value: Option<u32>| value.map_or("-".to_string(), |v| v.to_string());
        let line = format!(
            "{:<24} {:>5} {:>5} {:>8} {:>6} {:>7} {:>5}",
            truncate(front, 24),
            row.review.starting_stage,
            row.review.ending_stage,
            format_duration(row.review.seconds_elapsed),
            row.review.times_incorrect,
            streak(row.current_streak),
            streak(row.max_streak),
        );
        if row.is_clean() {
            out.push_str(&line.green().to_string());
        } else {
            out.push_str(&line.red().to_string());
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{:.0}% correct · {} total\n",
        summary.percent_correct() * 100.0,
        format_duration(summary.total_seconds())
    ));
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_relative_due() {
        let now = Utc::now();
        assert_eq!(relative_due(now - Duration::hours(3), now), "now");
        assert_eq!(relative_due(now + Duration::seconds(20), now), "in 1m");
        assert_eq!(relative_due(now + Duration::hours(4), now), "in 4h");
        assert_eq!(relative_due(now + Duration::hours(167), now), "in 6d");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long card front", 6), "a lon…");
    }

    #[test]
    fn test_summary_table_mentions_cards() {
        colored::control::set_override(false);
        let session = ReviewSession::new(vec![], Utc::now());
        let summary = SessionSummary {
            session,
            rows: vec![],
        };
        let table = summary_table(&summary);
        assert!(table.contains("Review summary"));
        assert!(table.contains("0% correct"));
    }
}

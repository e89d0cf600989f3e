// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Stage table: how many hours an item waits before it is due again.

use chrono::Duration;

/// Default intervals in hours, indexed by stage.
///
/// Stage 0 is due immediately; the last stage waits roughly four months.
pub const DEFAULT_STAGE_HOURS: &[u32] = &[0, 4, 8, 23, 47, 167, 335, 719, 2879];

/// Ordered, immutable table of review intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTable {
    hours: Vec<u32>,
}

impl StageTable {
    /// Build a custom table. Returns `None` for an empty table.
    pub fn new(hours: Vec<u32>) -> Option<Self> {
        if hours.is_empty() {
            return None;
        }
        Some(Self { hours })
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    /// Always false; a table has at least one stage.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Highest valid stage index.
    pub fn max_stage(&self) -> u32 {
        (self.hours.len() - 1) as u32
    }

    /// Clamp an arbitrary stage into `[0, len - 1]`.
    pub fn clamp(&self, stage: i64) -> u32 {
        stage.clamp(0, self.max_stage() as i64) as u32
    }

    /// Interval hours for a stage, clamping the index first.
    pub fn hours(&self, stage: i64) -> u32 {
        self.hours[self.clamp(stage) as usize]
    }

    /// Interval for a stage as a duration.
    pub fn interval(&self, stage: i64) -> Duration {
        Duration::hours(self.hours(stage) as i64)
    }

    /// Raw interval values.
    pub fn as_slice(&self) -> &[u32] {
        &self.hours
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            hours: DEFAULT_STAGE_HOURS.to_vec(),
        }
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Item scheduler.
//!
//! A correct bout (no incorrect answers) moves an item up one stage; each
//! incorrect answer in the bout moves it down one stage. The result is always
//! clamped into the stage table, so no stage input is ever an error.

use chrono::{DateTime, Utc};

use super::clock::SharedClock;
use super::stages::StageTable;

/// Result of one review bout, as far as scheduling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub times_incorrect: u32,
}

impl Outcome {
    pub fn correct() -> Self {
        Self { times_incorrect: 0 }
    }

    pub fn incorrect(times: u32) -> Self {
        Self {
            times_incorrect: times,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.times_incorrect == 0
    }
}

/// New stage and when the item becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub stage: u32,
    pub next_available: DateTime<Utc>,
}

/// Current and best streak for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streak {
    pub current: u32,
    pub max: u32,
}

impl Streak {
    pub fn new(current: u32, max: u32) -> Self {
        Self { current, max }
    }

    /// Apply a bout outcome.
    ///
    /// A clean bout extends the streak; any incorrect answer restarts it at 1.
    pub fn apply(&self, outcome: Outcome) -> Self {
        let current = if outcome.is_clean() {
            self.current.saturating_add(1)
        } else {
            1
        };
        Self {
            current,
            max: self.max.max(current),
        }
    }
}

/// Computes stage transitions against a stage table and a clock.
#[derive(Clone)]
pub struct Scheduler {
    stages: StageTable,
    clock: SharedClock,
}

impl Scheduler {
    pub fn new(stages: StageTable, clock: SharedClock) -> Self {
        Self { stages, clock }
    }

    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Handle to the clock, for components that time things themselves.
    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    /// Next stage for `current_stage` after `outcome`, clamped to the table.
    pub fn next_stage(&self, current_stage: i64, outcome: Outcome) -> u32 {
        let target = if outcome.is_clean() {
            current_stage.saturating_add(1)
        } else {
            current_stage.saturating_sub(outcome.times_incorrect as i64)
        };
        self.stages.clamp(target)
    }

    /// Transition an item after a bout.
    pub fn advance(&self, current_stage: i64, outcome: Outcome) -> Advance {
        let stage = self.next_stage(current_stage, outcome);
        Advance {
            stage,
            next_available: self.schedule(stage as i64),
        }
    }

    /// When an item sitting at `stage` becomes due, counted from now.
    pub fn schedule(&self, stage: i64) -> DateTime<Utc> {
        self.clock.now() + self.stages.interval(stage)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::clock::{Clock, FixedClock};
    use chrono::Duration;
    use std::sync::Arc;

    const DEFAULT_HOURS: &[u32] = crate::srs::stages::DEFAULT_STAGE_HOURS;

    fn scheduler(hours: Vec<u32>) -> (Scheduler, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let table = StageTable::new(hours).unwrap();
        (Scheduler::new(table, clock.clone()), clock)
    }

    #[test]
    fn test_clean_bout_moves_up_one_stage() {
        let (sched, clock) = scheduler(vec![0, 4, 8]);
        let result = sched.advance(1, Outcome::correct());
        assert_eq!(result.stage, 2);
        assert_eq!(result.next_available, clock.now() + Duration::hours(8));
    }

    #[test]
    fn test_incorrect_bout_drops_by_times_incorrect() {
        let (sched, clock) = scheduler(vec![0, 4, 8]);
        let result = sched.advance(1, Outcome::incorrect(2));
        assert_eq!(result.stage, 0);
        assert_eq!(result.next_available, clock.now());

        let (sched, _) = scheduler(DEFAULT_HOURS.to_vec());
        assert_eq!(sched.advance(6, Outcome::incorrect(2)).stage, 4);
    }

    #[test]
    fn test_top_stage_stays_at_top() {
        let (sched, _) = scheduler(vec![0, 4, 8]);
        assert_eq!(sched.advance(2, Outcome::correct()).stage, 2);
    }

    #[test]
    fn test_out_of_range_stages_are_clamped() {
        let (sched, _) = scheduler(vec![0, 4, 8]);
        assert_eq!(sched.advance(-10, Outcome::correct()).stage, 0);
        assert_eq!(sched.advance(50, Outcome::correct()).stage, 2);
        assert_eq!(sched.advance(50, Outcome::incorrect(1)).stage, 2);
        assert_eq!(sched.advance(i64::MAX, Outcome::correct()).stage, 2);
        assert_eq!(sched.advance(-3, Outcome::incorrect(4)).stage, 0);
    }

    #[test]
    fn test_advance_laws_over_default_table() {
        let (sched, _) = scheduler(DEFAULT_HOURS.to_vec());
        let max = sched.stages().max_stage() as i64;
        for s in 0..=max {
            assert_eq!(
                sched.advance(s, Outcome::correct()).stage as i64,
                (s + 1).min(max)
            );
            for k in 1..12u32 {
                assert_eq!(
                    sched.advance(s, Outcome::incorrect(k)).stage as i64,
                    (s - k as i64).max(0)
                );
            }
        }
    }

    #[test]
    fn test_advance_uses_injected_clock() {
        let (sched, clock) = scheduler(vec![0, 4, 8]);
        let first = sched.advance(0, Outcome::correct());
        clock.advance(Duration::hours(1));
        let second = sched.advance(0, Outcome::correct());
        assert_eq!(second.next_available - first.next_available, Duration::hours(1));
    }

    #[test]
    fn test_streak_extends_on_clean_bout() {
        let streak = Streak::new(3, 5).apply(Outcome::correct());
        assert_eq!(streak, Streak::new(4, 5));

        let streak = Streak::new(5, 5).apply(Outcome::correct());
        assert_eq!(streak, Streak::new(6, 6));
    }

    #[test]
    fn test_streak_resets_to_one_on_incorrect() {
        let streak = Streak::new(7, 9).apply(Outcome::incorrect(2));
        assert_eq!(streak, Streak::new(1, 9));

        let fresh = Streak::default().apply(Outcome::incorrect(1));
        assert_eq!(fresh, Streak::new(1, 1));
    }

    #[test]
    fn test_streak_max_never_decreases() {
        for current in 0..6 {
            for max in current..8 {
                let before = Streak::new(current, max);
                for outcome in [Outcome::correct(), Outcome::incorrect(3)] {
                    let after = before.apply(outcome);
                    assert!(after.max >= after.current);
                    assert!(after.max >= before.max);
                }
            }
        }
    }
}

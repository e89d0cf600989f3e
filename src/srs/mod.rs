// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Spaced-repetition scheduling.
//!
//! - **Stages**: the fixed stage table mapping a stage index to review intervals
//! - **Scheduler**: stage transitions, next-availability and streak arithmetic
//! - **Clock**: injectable time source so schedules are testable
//!
//! # Example
//!
//! ```rust,ignore
//! use recall::srs::{Outcome, Scheduler, StageTable, SystemClock};
//!
//! let scheduler = Scheduler::new(StageTable::default(), Arc::new(SystemClock));
//! let next = scheduler.advance(3, Outcome::correct());
//! assert_eq!(next.stage, 4);
//! ```

pub mod clock;
pub mod scheduler;
pub mod stages;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use scheduler::{Advance, Outcome, Scheduler, Streak};
pub use stages::{StageTable, DEFAULT_STAGE_HOURS};

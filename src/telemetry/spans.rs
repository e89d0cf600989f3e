// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Timing guards around commits and CLI operations.

use std::time::{Duration, Instant};

use tracing::{info_span, Span};

use super::metrics::GLOBAL_METRICS;

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Guard timing one terminal session commit.
///
/// Records duration and outcome to the global metrics under the commit kind
/// (`complete` or `cancel`).
pub struct CommitSpan {
    kind: &'static str,
    start: Instant,
    span: Span,
}

impl CommitSpan {
    pub fn start(kind: &'static str, session_id: &str, bouts: usize) -> Self {
        let span = info_span!(
            "session_commit",
            kind,
            session_id = %session_id,
            bouts,
            duration_ms = tracing::field::Empty,
            success = tracing::field::Empty,
        );

        Self {
            kind,
            start: Instant::now(),
            span,
        }
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) {
        let duration = self.start.elapsed();
        let success = result.is_ok();
        self.span.record("duration_ms", millis(duration));
        self.span.record("success", success);

        GLOBAL_METRICS.record_commit(self.kind, duration, success);
        tracing::debug!(parent: &self.span, success, "commit finished");
    }
}

/// Guard timing any named operation.
///
/// Records once, on [`finish`](Self::finish) or on drop, whichever comes first.
pub struct TimedOperation {
    name: String,
    start: Instant,
    span: Span,
    recorded: bool,
}

impl TimedOperation {
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            span: info_span!("operation", op = %name, duration_ms = tracing::field::Empty),
            recorded: false,
        }
    }

    pub fn finish(mut self) {
        self.record();
    }

    fn record(&mut self) {
        if std::mem::replace(&mut self.recorded, true) {
            return;
        }
        let duration = self.start.elapsed();
        self.span.record("duration_ms", millis(duration));
        GLOBAL_METRICS.record_operation(&self.name, duration);
    }
}

impl Drop for TimedOperation {
    fn drop(&mut self) {
        self.record();
    }
}

/// Time the enclosing scope.
///
/// ```rust,ignore
/// use recall::timed;
///
/// fn load_deck() {
///     let _timer = timed!("cli.load_deck");
///     // ...
/// } // recorded on drop
/// ```
#[macro_export]
macro_rules! timed {
    ($name:expr) => {
        $crate::telemetry::TimedOperation::start($name)
    };
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging, spans and metrics.
//!
//! - **Tracing**: structured logging to stderr, filtered by `RUST_LOG` or the
//!   configured log level
//! - **Spans**: [`CommitSpan`] around each terminal session commit and
//!   [`TimedOperation`] for anything else worth timing
//! - **Metrics**: in-process counters and latency histograms in [`GLOBAL_METRICS`]
//!
//! Store and service operations record timings only when the `telemetry`
//! feature is enabled (it is by default).
//!
//! ```rust,ignore
//! use recall::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```

mod init;
pub mod metrics;
pub mod spans;

pub use init::{init_telemetry, LogFormat, TelemetryConfig, TelemetryGuard};
pub use metrics::{
    CommitMetrics, Histogram, Metrics, MetricsSnapshot, OperationMetrics, GLOBAL_METRICS,
};
pub use spans::{CommitSpan, TimedOperation};

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscriber setup for the CLI and tests.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Shape of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One short line per event.
    Compact,
    /// Full fields, span context and source location when enabled.
    Full,
}

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level used when neither `directive` nor RUST_LOG is set.
    pub level: Level,
    pub format: LogFormat,
    /// Log span enter/close, which shows commit and query timings.
    pub span_events: bool,
    pub source_location: bool,
    pub ansi: bool,
    /// Explicit filter, e.g. `recall::store=debug`. Wins over RUST_LOG.
    pub directive: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            span_events: false,
            source_location: false,
            ansi: io::stderr().is_terminal(),
            directive: None,
        }
    }
}

impl TelemetryConfig {
    /// Debug output with span timings.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Full,
            span_events: true,
            source_location: true,
            ..Self::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            ansi: false,
            ..Self::default()
        }
    }

    /// Trace-level output scoped to this crate.
    pub fn testing() -> Self {
        Self {
            level: Level::TRACE,
            format: LogFormat::Full,
            span_events: true,
            ansi: false,
            directive: Some("recall=trace".to_string()),
            ..Self::default()
        }
    }

    /// Build from a configured level name ("info", "debug", ...).
    ///
    /// Unknown names keep the default level. `debug` and `trace` also turn on
    /// span events.
    pub fn from_level_name(name: &str) -> Self {
        match Level::from_str(name) {
            Ok(level) if level >= Level::DEBUG => Self {
                span_events: true,
                ..Self::default().with_level(level)
            },
            Ok(level) => Self::default().with_level(level),
            Err(_) => Self::default(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Guard held for the lifetime of the program.
pub struct TelemetryGuard {
    _private: (),
}

/// Install the global subscriber.
///
/// Logs go to stderr so command output on stdout stays clean. Call once at
/// startup; a second call fails.
///
/// ```rust,ignore
/// use recall::telemetry::{init_telemetry, TelemetryConfig};
///
/// let _guard = init_telemetry(&TelemetryConfig::from_level_name("info"))?;
/// ```
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events);

    let layer = match config.format {
        LogFormat::Compact => base.compact().with_target(false).boxed(),
        LogFormat::Full => base.with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(config.filter())
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(TelemetryGuard { _private: () })
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process metrics for store operations and session commits.
//!
//! Lightweight collection with no exporter; the CLI prints a report on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Terminal commits by kind ("complete", "cancel").
    commits: RwLock<HashMap<String, CommitMetrics>>,

    /// Timed operations by name.
    operations: RwLock<HashMap<String, OperationMetrics>>,

    /// Records written by successful commits.
    written: WriteCounters,

    start_time: Instant,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            commits: RwLock::new(HashMap::new()),
            operations: RwLock::new(HashMap::new()),
            written: WriteCounters::new(),
            start_time: Instant::now(),
        }
    }

    /// Record a terminal session commit.
    pub fn record_commit(&self, kind: &str, duration: Duration, success: bool) {
        let mut commits = write(&self.commits);
        commits
            .entry(kind.to_string())
            .or_insert_with(CommitMetrics::new)
            .record(duration, success);
    }

    /// Record a generic operation.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        let mut ops = write(&self.operations);
        ops.entry(name.to_string())
            .or_insert_with(OperationMetrics::new)
            .record(duration);
    }

    /// Count reviews created and items advanced by a commit.
    pub fn record_written(&self, reviews: u64, items: u64) {
        self.written.add(reviews, items);
    }

    pub fn commit_metrics(&self, kind: &str) -> Option<CommitMetrics> {
        read(&self.commits).get(kind).cloned()
    }

    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        read(&self.operations).get(name).cloned()
    }

    /// Reviews created and items advanced so far.
    pub fn written_counts(&self) -> (u64, u64) {
        self.written.totals()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (reviews_written, items_advanced) = self.written.totals();
        MetricsSnapshot {
            commits: read(&self.commits).clone(),
            operations: read(&self.operations).clone(),
            reviews_written,
            items_advanced,
            uptime: self.uptime(),
        }
    }

    pub fn reset(&self) {
        write(&self.commits).clear();
        write(&self.operations).clear();
        self.written.reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome counters for one kind of session commit.
#[derive(Debug, Clone)]
pub struct CommitMetrics {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl CommitMetrics {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            successes: 0,
            failures: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, duration: Duration, success: bool) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        if self.attempts == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.attempts as u32
        }
    }

    /// Fraction of attempts that committed (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            1.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

impl Default for CommitMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Operation timings with a latency histogram.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bucket bounds in microseconds.
    bounds: Vec<u64>,
    /// One more slot than `bounds` for the overflow bucket.
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_bounds(bounds: Vec<u64>) -> Self {
        let counts = vec![0; bounds.len() + 1];
        Self { bounds, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        let slot = self
            .bounds
            .iter()
            .position(|&bound| micros <= bound)
            .unwrap_or(self.bounds.len());
        self.counts[slot] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bounds(&self) -> &[u64] {
        &self.bounds
    }

    /// Approximate percentile, reported as the bound of the bucket it falls in.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut seen = 0u64;
        for (slot, &count) in self.counts.iter().enumerate() {
            seen += count;
            if seen >= target {
                let micros = match self.bounds.get(slot) {
                    Some(&bound) => bound,
                    None => self.bounds.last().copied().unwrap_or(0) * 10,
                };
                return Duration::from_micros(micros);
            }
        }
        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 100us, 1ms, 10ms, 100ms, 1s
        Self::with_bounds(vec![100, 1_000, 10_000, 100_000, 1_000_000])
    }
}

#[derive(Debug)]
struct WriteCounters {
    reviews: AtomicU64,
    items: AtomicU64,
}

impl WriteCounters {
    fn new() -> Self {
        Self {
            reviews: AtomicU64::new(0),
            items: AtomicU64::new(0),
        }
    }

    fn add(&self, reviews: u64, items: u64) {
        self.reviews.fetch_add(reviews, Ordering::Relaxed);
        self.items.fetch_add(items, Ordering::Relaxed);
    }

    fn totals(&self) -> (u64, u64) {
        (
            self.reviews.load(Ordering::Relaxed),
            self.items.load(Ordering::Relaxed),
        )
    }

    fn reset(&self) {
        self.reviews.store(0, Ordering::Relaxed);
        self.items.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of all metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub commits: HashMap<String, CommitMetrics>,
    pub operations: HashMap<String, OperationMetrics>,
    pub reviews_written: u64,
    pub items_advanced: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Metrics ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Written: {} reviews, {} items\n\n",
            self.reviews_written, self.items_advanced
        ));

        if !self.commits.is_empty() {
            report.push_str("Commits:\n");
            let mut kinds: Vec<_> = self.commits.iter().collect();
            kinds.sort_by(|a, b| a.0.cmp(b.0));
            for (kind, metrics) in kinds {
                report.push_str(&format!(
                    "  {}: {} attempts, {:.1}% committed, avg {:.2?}\n",
                    kind,
                    metrics.attempts,
                    metrics.success_rate() * 100.0,
                    metrics.avg_duration()
                ));
            }
            report.push('\n');
        }

        if !self.operations.is_empty() {
            report.push_str("Operations:\n");
            let mut names: Vec<_> = self.operations.iter().collect();
            names.sort_by(|a, b| a.0.cmp(b.0));
            for (name, metrics) in names {
                report.push_str(&format!(
                    "  {}: {} ops, avg {:.2?}, p99 {:.2?}\n",
                    name,
                    metrics.count,
                    metrics.avg_duration(),
                    metrics.histogram.p99()
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_metrics() {
        let mut metrics = CommitMetrics::new();
        metrics.record(Duration::from_millis(4), true);
        metrics.record(Duration::from_millis(8), false);

        assert_eq!(metrics.attempts, 2);
        assert_eq!(metrics.failures, 1);
        assert_eq!(metrics.avg_duration(), Duration::from_millis(6));
        assert!((metrics.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_operation_metrics() {
        let mut metrics = OperationMetrics::new();
        metrics.record(Duration::from_millis(10));
        metrics.record(Duration::from_millis(30));

        assert_eq!(metrics.count, 2);
        assert_eq!(metrics.avg_duration(), Duration::from_millis(20));
        assert_eq!(metrics.min_duration, Duration::from_millis(10));
    }

    #[test]
    fn test_histogram_buckets() {
        let mut hist = Histogram::default();
        hist.record(Duration::from_micros(50));
        hist.record(Duration::from_micros(500));
        hist.record(Duration::from_secs(5));

        assert_eq!(hist.counts()[0], 1);
        assert_eq!(hist.counts()[1], 1);
        assert_eq!(hist.counts()[hist.bounds().len()], 1);
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..100 {
            hist.record(Duration::from_micros(500));
        }
        assert_eq!(hist.p50(), Duration::from_micros(1_000));
        assert_eq!(hist.p99(), Duration::from_micros(1_000));
    }

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = Metrics::new();
        metrics.record_commit("complete", Duration::from_millis(3), true);
        metrics.record_operation("store.sqlite.commit", Duration::from_millis(1));
        metrics.record_written(4, 4);

        let snapshot = metrics.snapshot();
        assert!(snapshot.commits.contains_key("complete"));
        assert_eq!(snapshot.reviews_written, 4);
        assert!(snapshot.format_report().contains("complete: 1 attempts"));

        metrics.reset();
        assert!(metrics.commit_metrics("complete").is_none());
        assert_eq!(metrics.written_counts(), (0, 0));
    }
}

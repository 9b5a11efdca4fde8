//! Checker metrics tracking
//!
//! Thread-safe counters for remediation actions and cycle timings, using
//! atomics behind a cheaply clonable handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Thread-safe metrics for the consistency checker.
#[derive(Debug, Clone, Default)]
pub struct CheckerMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    orphans_deleted: AtomicUsize,
    virtual_objects_requeued: AtomicUsize,
    mismatches_reported: AtomicUsize,
    cycles_completed: AtomicUsize,
    last_cycle_duration_ms: AtomicU64,
    total_cycle_duration_ms: AtomicU64,
}

impl CheckerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully deleted orphan physical object.
    pub fn record_orphan_deleted(&self) {
        self.inner.orphans_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a virtual object handed back to the event-driven sync path.
    pub fn record_virtual_requeued(&self) {
        self.inner
            .virtual_objects_requeued
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fingerprint mismatch observed from the tenant side.
    pub fn record_mismatch_reported(&self) {
        self.inner
            .mismatches_reported
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed scan cycle and its wall-clock duration.
    pub fn record_cycle(&self, duration: Duration) {
        let millis = duration.as_millis() as u64;
        self.inner.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.inner
            .last_cycle_duration_ms
            .store(millis, Ordering::Relaxed);
        self.inner
            .total_cycle_duration_ms
            .fetch_add(millis, Ordering::Relaxed);
    }

    pub fn orphans_deleted(&self) -> usize {
        self.inner.orphans_deleted.load(Ordering::Relaxed)
    }

    pub fn virtual_objects_requeued(&self) -> usize {
        self.inner.virtual_objects_requeued.load(Ordering::Relaxed)
    }

    pub fn mismatches_reported(&self) -> usize {
        self.inner.mismatches_reported.load(Ordering::Relaxed)
    }

    pub fn cycles_completed(&self) -> usize {
        self.inner.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn last_cycle_duration_ms(&self) -> u64 {
        self.inner.last_cycle_duration_ms.load(Ordering::Relaxed)
    }

    /// Average cycle duration across all completed cycles.
    pub fn avg_cycle_duration_ms(&self) -> f64 {
        let total = self.inner.total_cycle_duration_ms.load(Ordering::Relaxed) as f64;
        let cycles = self.cycles_completed() as f64;

        if cycles > 0.0 { total / cycles } else { 0.0 }
    }

    /// Snapshot all metrics at a point in time.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            orphans_deleted: self.orphans_deleted(),
            virtual_objects_requeued: self.virtual_objects_requeued(),
            mismatches_reported: self.mismatches_reported(),
            cycles_completed: self.cycles_completed(),
            last_cycle_duration_ms: self.last_cycle_duration_ms(),
            avg_cycle_duration_ms: self.avg_cycle_duration_ms(),
        }
    }
}

/// Snapshot of checker metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub orphans_deleted: usize,
    pub virtual_objects_requeued: usize,
    pub mismatches_reported: usize,
    pub cycles_completed: usize,
    pub last_cycle_duration_ms: u64,
    pub avg_cycle_duration_ms: f64,
}

impl MetricsSummary {
    /// Log the metrics summary.
    pub fn log(&self) {
        log::info!("=== Consistency Checker Metrics Summary ===");
        log::info!(
            "Remediation: {} orphans deleted, {} virtual objects requeued, {} mismatches reported",
            self.orphans_deleted,
            self.virtual_objects_requeued,
            self.mismatches_reported
        );
        log::info!(
            "Cycles: {} completed, last {}ms, average {:.2}ms",
            self.cycles_completed,
            self.last_cycle_duration_ms,
            self.avg_cycle_duration_ms
        );
    }
}

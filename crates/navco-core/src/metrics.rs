//! Global atomic counters for audit runs.
//!
//! The pipeline bumps these as it goes; [`Metrics::flush`] logs a
//! [`MetricsSnapshot`] once at the end of [`crate::run_audit`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide counters shared by every audit run.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters, relaxed ordering throughout.
pub struct Metrics {
    versions_evaluated: AtomicU64,
    versions_skipped: AtomicU64,
    rows_loaded: AtomicU64,
    lookups_run: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Releases that loaded and reached the verdict engine.
    pub versions_evaluated: u64,
    /// Releases reported as unavailable or failed to load.
    pub versions_skipped: u64,
    /// Normalized rows across every loaded release.
    pub rows_loaded: u64,
    /// Case queries executed, configured or ad hoc.
    pub lookups_run: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            versions_evaluated: AtomicU64::new(0),
            versions_skipped: AtomicU64::new(0),
            rows_loaded: AtomicU64::new(0),
            lookups_run: AtomicU64::new(0),
        }
    }

    /// Count a release that reached the verdict engine.
    pub fn inc_versions_evaluated(&self) {
        self.bump(&self.versions_evaluated, 1, "versions_evaluated");
    }

    /// Count a release turned into a skipped report.
    pub fn inc_versions_skipped(&self) {
        self.bump(&self.versions_skipped, 1, "versions_skipped");
    }

    /// Add the row count of a freshly loaded release.
    pub fn add_rows_loaded(&self, rows: u64) {
        self.bump(&self.rows_loaded, rows, "rows_loaded");
    }

    /// Count one executed case query.
    pub fn inc_lookups(&self) {
        self.bump(&self.lookups_run, 1, "lookups_run");
    }

    fn bump(&self, counter: &AtomicU64, by: u64, metric: &'static str) {
        counter.fetch_add(by, Ordering::Relaxed);
        tracing::trace!(metric, by, "counter incremented");
    }

    /// Read every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            versions_evaluated: self.versions_evaluated.load(Ordering::Relaxed),
            versions_skipped: self.versions_skipped.load(Ordering::Relaxed),
            rows_loaded: self.rows_loaded.load(Ordering::Relaxed),
            lookups_run: self.lookups_run.load(Ordering::Relaxed),
        }
    }

    /// Log the current snapshot as one `info!` event.
    pub fn flush(&self) {
        let snap = self.snapshot();
        tracing::info!(
            metric = "flush",
            versions_evaluated = snap.versions_evaluated,
            versions_skipped = snap.versions_skipped,
            rows_loaded = snap.rows_loaded,
            lookups_run = snap.lookups_run,
        );
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.versions_evaluated,
            &self.versions_skipped,
            &self.rows_loaded,
            &self.lookups_run,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

//! Structured observability hooks for the audit lifecycle.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `AuditSpan` RAII guard
//! - Emission functions for key lifecycle events: start, dataset resolution
//!   and loading, skipped versions, participation and schema diagnostics,
//!   verdicts, finish
//!
//! Events are emitted at `info!` level, diagnostics at `warn!`.

use tracing::{info, warn};

use crate::verdict::Verdict;
use crate::versions::DatasetVersion;

/// RAII guard that enters a run-scoped tracing span for the duration of an
/// audit.
///
/// # Example
///
/// ```ignore
/// let _span = AuditSpan::enter("0b6f...");
/// // every event below now carries run_id
/// ```
pub struct AuditSpan {
    _span: tracing::span::EnteredSpan,
}

impl AuditSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("navco.audit", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: audit started over `versions` releases.
pub fn emit_audit_started(run_id: &str, store: &str, versions: usize) {
    info!(event = "audit.started", run_id = %run_id, store = %store, versions = versions);
}

/// Emit event: a candidate file was chosen for a release.
pub fn emit_dataset_resolved(version: DatasetVersion, file_name: &str, format: &str) {
    info!(
        event = "dataset.resolved",
        version = %version,
        file_name = %file_name,
        format = %format,
    );
}

/// Emit event: a release was loaded and normalized.
pub fn emit_dataset_loaded(version: DatasetVersion, rows: usize, columns: usize, sha256: &str) {
    info!(
        event = "dataset.loaded",
        version = %version,
        rows = rows,
        columns = columns,
        sha256 = %sha256,
    );
}

/// Emit event: a release was skipped (warning level).
pub fn emit_version_skipped(version: DatasetVersion, status: &str, error: &dyn std::fmt::Display) {
    warn!(event = "version.skipped", version = %version, status = %status, error = %error);
}

/// Emit event: no participation path exists for a release (warning level).
pub fn emit_participation_absent(version: DatasetVersion, found: &[String]) {
    warn!(
        event = "participation.absent",
        version = %version,
        found = %found.join(", "),
    );
}

/// Emit event: identifying columns missing from a release (warning level).
pub fn emit_schema_mismatch(version: DatasetVersion, columns: &[String]) {
    warn!(event = "schema.mismatch", version = %version, columns = %columns.join(", "));
}

/// Emit event: verdict computed for a release.
pub fn emit_verdict_evaluated(version: DatasetVersion, verdict: Verdict, campaign: Option<&str>) {
    info!(
        event = "verdict.evaluated",
        version = %version,
        verdict = %verdict,
        campaign = campaign.unwrap_or(""),
    );
}

/// Emit event: audit finished.
pub fn emit_audit_finished(run_id: &str, duration_ms: u64, evaluated: usize, skipped: usize) {
    info!(
        event = "audit.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        evaluated = evaluated,
        skipped = skipped,
    );
}

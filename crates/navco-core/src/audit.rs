//! Audit pipeline.
//!
//! For each configured release: resolve a candidate file, read and decode it,
//! normalize columns, resolve participation and select failures, evaluate the
//! verdict, then run the release's forensic case lookups. Releases are
//! processed sequentially and independently; a release that cannot be found
//! or decoded becomes a skipped [`VersionReport`] and never aborts the rest.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::case_lookup::{lookup_cases, CaseLookupResult, CaseQuery};
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::failure::select_failures;
use crate::loader::load_table;
use crate::metrics::METRICS;
use crate::obs::{self, AuditSpan};
use crate::participation::{participation_like_columns, resolve_participation, ParticipationSource};
use crate::reporting::{AuditReport, SourceSummary, VersionOutcome, VersionReport};
use crate::schema::RecordSet;
use crate::source::{fetch_source, resolve_candidate, DatasetStore};
use crate::verdict::evaluate_verdict;
use crate::versions::DatasetVersion;

/// A release loaded and normalized, ready for analysis.
#[derive(Debug, Clone)]
pub struct LoadedVersion {
    pub version: DatasetVersion,
    pub source: SourceSummary,
    pub records: RecordSet,
}

/// Resolve, read, decode and normalize one release.
pub fn load_version(store: &dyn DatasetStore, version: DatasetVersion) -> Result<LoadedVersion> {
    let resolved = resolve_candidate(store, version)?;
    obs::emit_dataset_resolved(version, &resolved.file_name, resolved.format.as_str());

    let file = fetch_source(store, resolved)?;
    let raw = load_table(&file.bytes, file.resolved.format).map_err(|source| AuditError::Load {
        version,
        file_name: file.resolved.file_name.clone(),
        source,
    })?;
    let records = RecordSet::from_raw(raw);

    obs::emit_dataset_loaded(version, records.len(), records.columns().len(), &file.sha256);
    METRICS.add_rows_loaded(records.len() as u64);

    Ok(LoadedVersion {
        version,
        source: SourceSummary::from(&file),
        records,
    })
}

/// Run `queries` against a loaded release. Missing identifying columns are
/// reported as schema mismatches but never stop the lookup.
pub fn run_case_lookups(loaded: &LoadedVersion, queries: &[CaseQuery]) -> Vec<CaseLookupResult> {
    let mapping = &loaded.version.descriptor().columns;
    queries
        .iter()
        .map(|query| {
            METRICS.inc_lookups();
            lookup_cases(&loaded.records, mapping, query)
        })
        .collect()
}

/// Analyze a loaded release.
pub fn evaluate_loaded(loaded: &LoadedVersion, config: &AuditConfig) -> VersionReport {
    let version = loaded.version;
    let descriptor = version.descriptor();
    let mapping = &descriptor.columns;
    let set = &loaded.records;
    let mut diagnostics = Vec::new();

    let participation = resolve_participation(set, mapping, config.declared_scale_for(version));
    if let ParticipationSource::Absent {
        participation_like_columns,
    } = &participation.source
    {
        obs::emit_participation_absent(version, participation_like_columns);
    }

    let failures = select_failures(set, mapping);
    if failures.used_fallback {
        diagnostics.push(format!(
            "nonviolent indicator {} absent; used {}",
            mapping.nonviolent.name,
            failures.nonviolent_column.as_deref().unwrap_or("-")
        ));
    }
    if failures.ambiguous_rows > 0 {
        tracing::debug!(
            version = %version,
            ambiguous = failures.ambiguous_rows,
            "rows excluded for missing or unrecognised indicator codes"
        );
    }

    let result = evaluate_verdict(version, set, mapping, &failures, &participation);
    obs::emit_verdict_evaluated(
        version,
        result.verdict(),
        result
            .decided()
            .and_then(|r| r.selected_campaign.as_deref()),
    );

    let case_lookups = run_case_lookups(loaded, &config.case_queries_for(version));
    if let Some(missing) = case_lookups
        .iter()
        .map(|l| &l.missing_columns)
        .find(|m| !m.is_empty())
    {
        obs::emit_schema_mismatch(version, missing);
        let mismatch = AuditError::SchemaMismatch {
            version,
            columns: missing.clone(),
        };
        diagnostics.push(mismatch.to_string());
    }

    VersionReport {
        version,
        title: descriptor.title.to_string(),
        source: Some(loaded.source.clone()),
        column_count: set.columns().len(),
        row_count: set.len(),
        participation: Some(participation.source),
        outcome: VersionOutcome::Evaluated { result },
        case_lookups,
        diagnostics,
    }
}

/// Convert a release-scoped failure into a skipped report.
fn skipped_report(version: DatasetVersion, err: &AuditError) -> VersionReport {
    let outcome = match err {
        AuditError::DatasetUnavailable { .. } => VersionOutcome::Unavailable {
            detail: err.to_string(),
        },
        _ => VersionOutcome::LoadFailed {
            detail: err.to_string(),
        },
    };
    obs::emit_version_skipped(version, outcome.status(), err);
    VersionReport::skipped(version, outcome)
}

/// Full pipeline for one release. Never fails; problems become a skipped
/// report.
pub fn analyze_version(
    store: &dyn DatasetStore,
    version: DatasetVersion,
    config: &AuditConfig,
) -> VersionReport {
    match load_version(store, version) {
        Ok(loaded) => {
            METRICS.inc_versions_evaluated();
            evaluate_loaded(&loaded, config)
        }
        Err(err) => {
            METRICS.inc_versions_skipped();
            skipped_report(version, &err)
        }
    }
}

/// Audit every configured release in order.
pub fn run_audit(store: &dyn DatasetStore, config: &AuditConfig) -> AuditReport {
    let run_id = Uuid::new_v4();
    let run_id_str = run_id.to_string();
    let _span = AuditSpan::enter(&run_id_str);
    let started = Instant::now();

    obs::emit_audit_started(&run_id_str, &store.describe(), config.versions.len());

    let versions: Vec<VersionReport> = config
        .versions
        .iter()
        .map(|&version| analyze_version(store, version, config))
        .collect();

    let report = AuditReport::new(run_id, versions);
    obs::emit_audit_finished(
        &run_id_str,
        started.elapsed().as_millis() as u64,
        report.evaluated_count(),
        report.skipped_count(),
    );
    METRICS.flush();
    report
}

/// Canonical and participation-like columns of one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnListing {
    pub version: DatasetVersion,
    pub source: SourceSummary,
    pub columns: Vec<String>,
    pub participation_like: Vec<String>,
}

/// List the normalized columns of a release.
pub fn list_columns(store: &dyn DatasetStore, version: DatasetVersion) -> Result<ColumnListing> {
    let loaded = load_version(store, version)?;
    let columns = loaded.records.columns().to_vec();
    Ok(ColumnListing {
        version,
        source: loaded.source,
        participation_like: participation_like_columns(&columns),
        columns,
    })
}

/// Run a single ad hoc case query against a release.
pub fn lookup_in_version(
    store: &dyn DatasetStore,
    version: DatasetVersion,
    query: &CaseQuery,
) -> Result<CaseLookupResult> {
    let loaded = load_version(store, version)?;
    METRICS.inc_lookups();
    let result = lookup_cases(&loaded.records, &version.descriptor().columns, query);
    if !result.missing_columns.is_empty() {
        obs::emit_schema_mismatch(version, &result.missing_columns);
    }
    Ok(result)
}

//! NAVCO Core Library
//!
//! Audits the "3.5% rule" (no nonviolent campaign that mobilized at least
//! 3.5% of the population has failed) against the NAVCO 1.1, 1.2, 1.3 and 2.1
//! dataset releases, and re-exports the components for programmatic access.

pub mod audit;
pub mod case_lookup;
pub mod config;
pub mod error;
pub mod failure;
pub mod loader;
pub mod metrics;
pub mod obs;
pub mod participation;
pub mod reporting;
pub mod schema;
pub mod source;
pub mod telemetry;
pub mod verdict;
pub mod versions;

pub use audit::{
    analyze_version, evaluate_loaded, list_columns, load_version, lookup_in_version, run_audit,
    run_case_lookups, ColumnListing, LoadedVersion,
};
pub use case_lookup::{
    lookup_cases, size_category_label, CaseLookupResult, CaseMatch, CaseQuery, MatchField,
};
pub use config::AuditConfig;
pub use error::{AuditError, Result};
pub use failure::{select_failures, FailureSelection};
pub use loader::{load_table, CellValue, LoadError, RawTable};
pub use participation::{
    derive_from_raw, participation_like_columns, resolve_participation, ParticipationScale,
    ParticipationSource, ParticipationValue, ResolvedParticipation, RULE_THRESHOLD_FRACTION,
};
pub use reporting::{
    render_audit_summary_md, write_audit_report_json, write_audit_summary_md, AuditReport,
    SourceSummary, VersionOutcome, VersionReport,
};
pub use schema::{normalize_column_name, normalize_columns, CampaignRecord, RecordSet};
pub use source::{
    fetch_source, resolve_candidate, DatasetStore, DirStore, MemoryStore, ResolvedSource,
    SourceFile,
};
pub use telemetry::init_tracing;
pub use verdict::{
    evaluate_verdict, IndeterminateReason, IndeterminateRecord, Verdict, VerdictOutcome,
    VerdictRecord,
};
pub use versions::{DatasetVersion, FileFormat, VersionDescriptor};

/// Crate version, used by the CLI's `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

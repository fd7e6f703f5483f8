use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::case_lookup::CaseLookupResult;
use crate::participation::ParticipationSource;
use crate::source::SourceFile;
use crate::verdict::{IndeterminateRecord, Verdict, VerdictOutcome, VerdictRecord};
use crate::versions::{DatasetVersion, FileFormat};

/// Schema version of the persisted audit report.
pub const AUDIT_REPORT_SCHEMA_VERSION: &str = "1.0";

/// The file a release was read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSummary {
    pub file_name: String,
    pub format: FileFormat,
    pub sha256: String,
}

impl From<&SourceFile> for SourceSummary {
    fn from(file: &SourceFile) -> Self {
        Self {
            file_name: file.resolved.file_name.clone(),
            format: file.resolved.format,
            sha256: file.sha256.clone(),
        }
    }
}

/// What happened to one release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionOutcome {
    Evaluated { result: VerdictOutcome },
    /// No candidate file exists.
    Unavailable { detail: String },
    /// A candidate exists but could not be read or decoded.
    LoadFailed { detail: String },
}

impl VersionOutcome {
    pub fn is_skipped(&self) -> bool {
        !matches!(self, Self::Evaluated { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Evaluated { .. } => "evaluated",
            Self::Unavailable { .. } => "unavailable",
            Self::LoadFailed { .. } => "load_failed",
        }
    }
}

/// Per-release section of the audit report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionReport {
    pub version: DatasetVersion,
    pub title: String,
    pub source: Option<SourceSummary>,
    pub column_count: usize,
    pub row_count: usize,
    pub participation: Option<ParticipationSource>,
    pub outcome: VersionOutcome,
    #[serde(default)]
    pub case_lookups: Vec<CaseLookupResult>,
    /// Non-fatal findings, e.g. missing identifying columns.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl VersionReport {
    pub fn skipped(version: DatasetVersion, outcome: VersionOutcome) -> Self {
        Self {
            version,
            title: version.descriptor().title.to_string(),
            source: None,
            column_count: 0,
            row_count: 0,
            participation: None,
            outcome,
            case_lookups: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Verdict for this release; skipped releases count as indeterminate.
    pub fn verdict(&self) -> Verdict {
        match &self.outcome {
            VersionOutcome::Evaluated { result } => result.verdict(),
            _ => Verdict::Indeterminate,
        }
    }

    pub fn verdict_outcome(&self) -> Option<&VerdictOutcome> {
        match &self.outcome {
            VersionOutcome::Evaluated { result } => Some(result),
            _ => None,
        }
    }
}

/// Canonical audit artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditReport {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub versions: Vec<VersionReport>,
}

impl AuditReport {
    pub fn new(run_id: Uuid, versions: Vec<VersionReport>) -> Self {
        Self {
            schema_version: AUDIT_REPORT_SCHEMA_VERSION.to_string(),
            run_id,
            generated_at: Utc::now(),
            versions,
        }
    }

    pub fn version(&self, version: DatasetVersion) -> Option<&VersionReport> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn evaluated_count(&self) -> usize {
        self.versions.iter().filter(|v| !v.outcome.is_skipped()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.versions.iter().filter(|v| v.outcome.is_skipped()).count()
    }
}

/// Write the audit report in pretty JSON format.
pub fn write_audit_report_json(path: &Path, report: &AuditReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize audit report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

fn render_decided(out: &mut String, record: &VerdictRecord) {
    out.push_str(&format!("- verdict: **{}**\n", record.verdict));
    out.push_str(&format!(
        "- selected: {} ({})\n",
        opt(&record.selected_campaign),
        opt(&record.selected_year)
    ));
    out.push_str(&format!(
        "- participation: {} ({:.4}%)\n- threshold: {} ({})\n- failures considered: {}\n",
        record.participation_value,
        record.participation_fraction * 100.0,
        record.threshold_used,
        record.scale.as_str(),
        record.failures_considered
    ));
}

fn render_indeterminate(out: &mut String, record: &IndeterminateRecord) {
    out.push_str(&format!("- verdict: **{}**\n", Verdict::Indeterminate));
    out.push_str(&format!("- reason: {}\n", record.reason.as_str()));
    if record.found_participation_like_columns.is_empty() {
        out.push_str("- participation-like columns: none\n");
    } else {
        out.push_str(&format!(
            "- participation-like columns: {}\n",
            record.found_participation_like_columns.join(", ")
        ));
    }
}

/// Render markdown summary of an audit.
pub fn render_audit_summary_md(report: &AuditReport) -> String {
    let mut out = String::new();
    out.push_str("# 3.5% Rule Audit\n\n");
    out.push_str(&format!(
        "- run: `{}`\n- versions evaluated: {}\n- versions skipped: {}\n\n",
        report.run_id,
        report.evaluated_count(),
        report.skipped_count()
    ));

    for version in &report.versions {
        out.push_str(&format!("## {}\n", version.title));
        match &version.outcome {
            VersionOutcome::Unavailable { detail } | VersionOutcome::LoadFailed { detail } => {
                out.push_str(&format!(
                    "- status: {}\n- detail: {}\n\n",
                    version.outcome.status(),
                    detail
                ));
                continue;
            }
            VersionOutcome::Evaluated { result } => {
                if let Some(source) = &version.source {
                    out.push_str(&format!(
                        "- source: `{}` ({}, sha256 `{}`)\n",
                        source.file_name, source.format, source.sha256
                    ));
                }
                out.push_str(&format!(
                    "- rows: {}\n- columns: {}\n",
                    version.row_count, version.column_count
                ));
                match result {
                    VerdictOutcome::Decided(record) => render_decided(&mut out, record),
                    VerdictOutcome::Indeterminate(record) => render_indeterminate(&mut out, record),
                }
            }
        }

        for diagnostic in &version.diagnostics {
            out.push_str(&format!("- warning: {}\n", diagnostic));
        }

        for lookup in &version.case_lookups {
            let year = lookup
                .query
                .year
                .map(|y| format!(", {y}"))
                .unwrap_or_default();
            out.push_str(&format!(
                "\n### Case lookup: \"{}\"{}\n",
                lookup.query.text, year
            ));
            if lookup.matches.is_empty() {
                out.push_str("- no matching records\n");
            }
            for m in &lookup.matches {
                out.push_str(&format!(
                    "- {} | {} | {} | success: {} | nonviolent: {} | size: {}\n",
                    opt(&m.campaign),
                    opt(&m.year),
                    opt(&m.location),
                    flag(m.success),
                    flag(m.nonviolent),
                    opt(&m.size_category_label)
                ));
            }
        }
        out.push('\n');
    }
    out
}

/// Write the markdown summary.
pub fn write_audit_summary_md(path: &Path, report: &AuditReport) -> Result<()> {
    let md = render_audit_summary_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

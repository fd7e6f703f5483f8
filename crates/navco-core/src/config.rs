//! Audit run configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! (or no file at all) reproduces the standard four-release audit.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::case_lookup::CaseQuery;
use crate::error::{AuditError, Result};
use crate::participation::ParticipationScale;
use crate::versions::DatasetVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Releases to audit, in order.
    #[serde(default = "default_versions")]
    pub versions: Vec<DatasetVersion>,
    /// Explicit storage scale of the precomputed participation column.
    /// Bypasses the magnitude heuristic for the listed releases.
    #[serde(default)]
    pub scale_overrides: BTreeMap<DatasetVersion, ParticipationScale>,
    /// Replaces a release's default forensic case queries.
    #[serde(default)]
    pub case_queries: BTreeMap<DatasetVersion, Vec<CaseQuery>>,
    #[serde(default = "default_true")]
    pub run_case_lookups: bool,
}

fn default_versions() -> Vec<DatasetVersion> {
    DatasetVersion::AUDIT_ORDER.to_vec()
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            versions: default_versions(),
            scale_overrides: BTreeMap::new(),
            case_queries: BTreeMap::new(),
            run_case_lookups: true,
        }
    }
}

impl AuditConfig {
    /// Read a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            AuditError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would audit nothing or the same release twice.
    pub fn validate(&self) -> Result<()> {
        if self.versions.is_empty() {
            return Err(AuditError::InvalidConfig(
                "versions must not be empty".to_string(),
            ));
        }
        for (i, version) in self.versions.iter().enumerate() {
            if self.versions[..i].contains(version) {
                return Err(AuditError::InvalidConfig(format!(
                    "version {version} listed more than once"
                )));
            }
        }
        Ok(())
    }

    /// Restrict the run to `only`, keeping configured order.
    pub fn restrict_to(&mut self, only: &[DatasetVersion]) {
        if !only.is_empty() {
            self.versions.retain(|v| only.contains(v));
        }
    }

    /// Scale to declare for `version`: the configured override, else the
    /// release descriptor's own declaration.
    pub fn declared_scale_for(&self, version: DatasetVersion) -> Option<ParticipationScale> {
        self.scale_overrides
            .get(&version)
            .copied()
            .or(version.descriptor().declared_scale)
    }

    /// Case queries to run for `version`.
    pub fn case_queries_for(&self, version: DatasetVersion) -> Vec<CaseQuery> {
        if !self.run_case_lookups {
            return Vec::new();
        }
        self.case_queries
            .get(&version)
            .cloned()
            .unwrap_or_else(|| version.default_case_queries())
    }
}

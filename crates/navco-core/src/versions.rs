//! The four NAVCO releases and their immutable per-release descriptors.
//!
//! Every version-specific difference (candidate files, column names, indicator
//! fallbacks, forensic case queries) lives in one [`VersionDescriptor`] per
//! [`DatasetVersion`] variant. Downstream components never branch on the
//! version itself; they consume the descriptor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::case_lookup::{CaseQuery, MatchField};
use crate::error::AuditError;
use crate::participation::ParticipationScale;

/// A known NAVCO dataset release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DatasetVersion {
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "1.2")]
    V1_2,
    #[serde(rename = "1.3")]
    V1_3,
    #[serde(rename = "2.1")]
    V2_1,
}

impl DatasetVersion {
    /// All releases in ascending release order.
    pub const ALL: [DatasetVersion; 4] = [Self::V1_1, Self::V1_2, Self::V1_3, Self::V2_1];

    /// Order in which a full audit walks the releases.
    pub const AUDIT_ORDER: [DatasetVersion; 4] = [Self::V1_1, Self::V1_2, Self::V2_1, Self::V1_3];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_1 => "1.1",
            Self::V1_2 => "1.2",
            Self::V1_3 => "1.3",
            Self::V2_1 => "2.1",
        }
    }

    /// The static descriptor for this release.
    pub fn descriptor(self) -> &'static VersionDescriptor {
        match self {
            Self::V1_1 => &NAVCO_1_1,
            Self::V1_2 => &NAVCO_1_2,
            Self::V1_3 => &NAVCO_1_3,
            Self::V2_1 => &NAVCO_2_1,
        }
    }

    /// Forensic case queries run against this release unless overridden.
    pub fn default_case_queries(self) -> Vec<CaseQuery> {
        match self {
            Self::V1_1 | Self::V1_2 => Vec::new(),
            Self::V1_3 => vec![CaseQuery::new("Hong Kong", MatchField::Campaign)],
            Self::V2_1 => vec![CaseQuery::new("Bahrain", MatchField::Location).with_year(2011)],
        }
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetVersion {
    type Err = AuditError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        match bare {
            "1.1" => Ok(Self::V1_1),
            "1.2" => Ok(Self::V1_2),
            "1.3" => Ok(Self::V1_3),
            "2.1" => Ok(Self::V2_1),
            _ => Err(AuditError::UnknownVersion(s.to_string())),
        }
    }
}

/// On-disk format of a candidate file. Loaders dispatch on this tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// Stata `.dta` binary table.
    StataDta,
    /// Office Open XML workbook.
    Xlsx,
    /// Legacy BIFF workbook.
    Xls,
    /// Comma separated text with a header row.
    Delimited,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StataDta => "stata_dta",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Delimited => "delimited",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One acceptable file for a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub file_name: &'static str,
    pub format: FileFormat,
}

/// A boolean indicator stored as a numeric code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorColumn {
    /// Canonical (normalized) column name.
    pub name: &'static str,
    /// Code meaning "true".
    pub true_value: f64,
    /// Code meaning "false".
    pub false_value: f64,
}

impl IndicatorColumn {
    /// Indicator coded 1 for true and 0 for false.
    pub const fn binary(name: &'static str) -> Self {
        Self {
            name,
            true_value: 1.0,
            false_value: 0.0,
        }
    }

    /// Decode a numeric cell into a tri-state flag. Codes other than the two
    /// sentinels are treated as unknown.
    pub fn decode(&self, code: f64) -> Option<bool> {
        if code == self.true_value {
            Some(true)
        } else if code == self.false_value {
            Some(false)
        } else {
            None
        }
    }
}

/// Canonical column names a release uses for each concept.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub nonviolent: IndicatorColumn,
    /// Used only when `nonviolent` is absent from the file.
    pub nonviolent_fallback: Option<IndicatorColumn>,
    pub success: IndicatorColumn,
    /// Natural log of population in thousands.
    pub log_population: Option<&'static str>,
    pub peak_membership: Option<&'static str>,
    pub precomputed_participation: Option<&'static str>,
    pub campaign: &'static str,
    pub year: &'static str,
    pub location: &'static str,
    pub size_category: Option<&'static str>,
}

impl ColumnMapping {
    /// Log population column, mapped or [`LOG_POPULATION`].
    pub fn log_population_column(&self) -> &'static str {
        self.log_population.unwrap_or(LOG_POPULATION)
    }

    /// Peak membership column, mapped or [`PEAK_MEMBERSHIP`].
    pub fn peak_membership_column(&self) -> &'static str {
        self.peak_membership.unwrap_or(PEAK_MEMBERSHIP)
    }

    /// Precomputed participation column, mapped or
    /// [`PERCENTAGE_POPULAR_PARTICIPATION`].
    pub fn precomputed_column(&self) -> &'static str {
        self.precomputed_participation
            .unwrap_or(PERCENTAGE_POPULAR_PARTICIPATION)
    }
}

/// Everything the pipeline needs to know about one release.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDescriptor {
    pub version: DatasetVersion,
    /// Human readable heading, e.g. coverage years.
    pub title: &'static str,
    /// Acceptable files, most preferred first.
    pub candidates: &'static [Candidate],
    pub columns: ColumnMapping,
    /// Explicit storage scale of the precomputed column. `None` means the
    /// scale is inferred from magnitude at comparison time.
    pub declared_scale: Option<ParticipationScale>,
}

/// Canonical name of the precomputed participation column.
pub const PERCENTAGE_POPULAR_PARTICIPATION: &str = "PERCENTAGE POPULAR PARTICIPATION";

/// Canonical name of the log population column (thousands, natural log).
pub const LOG_POPULATION: &str = "LNPOP";

/// Canonical name of the peak membership column.
pub const PEAK_MEMBERSHIP: &str = "PEAKMEMBERSHIP";

const NAVCO_1_COLUMNS: ColumnMapping = ColumnMapping {
    nonviolent: IndicatorColumn::binary("NONVIOL"),
    nonviolent_fallback: None,
    success: IndicatorColumn::binary("SUCCESS"),
    log_population: None,
    peak_membership: None,
    precomputed_participation: None,
    campaign: "CAMPAIGN",
    year: "BYEAR",
    location: "LOCATION",
    size_category: None,
};

static NAVCO_1_1: VersionDescriptor = VersionDescriptor {
    version: DatasetVersion::V1_1,
    title: "NAVCO 1.1 (Data Range: 1900-2006)",
    candidates: &[
        Candidate {
            file_name: "NAVCO 1.1.dta",
            format: FileFormat::StataDta,
        },
        Candidate {
            file_name: "NAVCO 1.1.csv",
            format: FileFormat::Delimited,
        },
    ],
    columns: ColumnMapping {
        log_population: Some(LOG_POPULATION),
        peak_membership: Some(PEAK_MEMBERSHIP),
        ..NAVCO_1_COLUMNS
    },
    declared_scale: None,
};

static NAVCO_1_2: VersionDescriptor = VersionDescriptor {
    version: DatasetVersion::V1_2,
    title: "NAVCO 1.2 (Data Range: 1945-2013)",
    candidates: &[
        Candidate {
            file_name: "NAVCO 1.2 Updated.xlsx",
            format: FileFormat::Xlsx,
        },
        Candidate {
            file_name: "NAVCO 1.2 Updated.csv",
            format: FileFormat::Delimited,
        },
    ],
    columns: ColumnMapping {
        precomputed_participation: Some(PERCENTAGE_POPULAR_PARTICIPATION),
        ..NAVCO_1_COLUMNS
    },
    declared_scale: None,
};

static NAVCO_1_3: VersionDescriptor = VersionDescriptor {
    version: DatasetVersion::V1_3,
    title: "NAVCO 1.3 (Data Range: 1900-2019)",
    candidates: &[
        Candidate {
            file_name: "NAVCO 1.3 List.xlsx",
            format: FileFormat::Xlsx,
        },
        Candidate {
            file_name: "NAVCO 1.3 List.csv",
            format: FileFormat::Delimited,
        },
    ],
    columns: ColumnMapping {
        nonviolent_fallback: Some(IndicatorColumn::binary("PRIM_METHOD")),
        ..NAVCO_1_COLUMNS
    },
    declared_scale: None,
};

static NAVCO_2_1: VersionDescriptor = VersionDescriptor {
    version: DatasetVersion::V2_1,
    title: "NAVCO 2.1 (Annual Data - Chenoweth & Shay, 2019)",
    candidates: &[
        Candidate {
            file_name: "NAVCO2-1_ForPublication.xls",
            format: FileFormat::Xls,
        },
        Candidate {
            file_name: "NAVCO2-1_ForPublication.xlsx",
            format: FileFormat::Xlsx,
        },
        Candidate {
            file_name: "NAVCO2-1_ForPublication.csv",
            format: FileFormat::Delimited,
        },
    ],
    columns: ColumnMapping {
        nonviolent_fallback: Some(IndicatorColumn::binary("PRIM_METH")),
        campaign: "CAMP_NAME",
        year: "YEAR",
        size_category: Some("CAMP_SIZE_CAT"),
        ..NAVCO_1_COLUMNS
    },
    declared_scale: None,
};

//! Forensic case lookup.
//!
//! Finds specific campaigns in a normalized record set by case-insensitive
//! substring match, independent of whether participation data exists. Used to
//! show what a release actually records about a named case (its outcome,
//! method and size category) next to the rule verdict.

use serde::{Deserialize, Serialize};

use crate::schema::{CampaignRecord, RecordSet};
use crate::versions::ColumnMapping;

/// Which identifying field a query text is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Location,
    Campaign,
    /// Location or campaign name.
    #[default]
    Any,
}

impl std::str::FromStr for MatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "location" => Ok(Self::Location),
            "campaign" => Ok(Self::Campaign),
            "any" => Ok(Self::Any),
            other => Err(format!("unknown match field: {other}")),
        }
    }
}

/// A case to look up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseQuery {
    pub text: String,
    #[serde(default)]
    pub field: MatchField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
}

impl CaseQuery {
    pub fn new(text: impl Into<String>, field: MatchField) -> Self {
        Self {
            text: text.into(),
            field,
            year: None,
        }
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    fn matches(&self, record: &CampaignRecord) -> bool {
        if let Some(year) = self.year {
            if record.year != Some(year) {
                return false;
            }
        }
        let needle = self.text.to_lowercase();
        let contains = |value: &Option<String>| {
            value
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };
        match self.field {
            MatchField::Location => contains(&record.location),
            MatchField::Campaign => contains(&record.campaign),
            MatchField::Any => contains(&record.location) || contains(&record.campaign),
        }
    }
}

/// Human-readable band for a campaign size category code.
pub fn size_category_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("1-1,000"),
        2 => Some("1,001-10,000"),
        3 => Some("10,001-100,000"),
        4 => Some("100,001-1,000,000"),
        5 => Some("more than 1,000,000"),
        _ => None,
    }
}

/// One record matching a case query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMatch {
    pub row: usize,
    pub campaign: Option<String>,
    pub year: Option<i64>,
    pub location: Option<String>,
    pub success: Option<bool>,
    pub nonviolent: Option<bool>,
    pub size_category: Option<i64>,
    pub size_category_label: Option<String>,
}

impl From<CampaignRecord> for CaseMatch {
    fn from(record: CampaignRecord) -> Self {
        let size_category_label = record
            .size_category
            .and_then(size_category_label)
            .map(str::to_string);
        Self {
            row: record.row,
            campaign: record.campaign,
            year: record.year,
            location: record.location,
            success: record.success,
            nonviolent: record.nonviolent,
            size_category: record.size_category,
            size_category_label,
        }
    }
}

/// All matches for one query, plus identifying columns the release lacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseLookupResult {
    pub query: CaseQuery,
    pub matches: Vec<CaseMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
}

/// Identifying columns of `mapping` absent from `set`.
pub fn missing_identifying_columns(set: &RecordSet, mapping: &ColumnMapping) -> Vec<String> {
    [mapping.campaign, mapping.year, mapping.location]
        .into_iter()
        .filter(|c| !set.has_column(c))
        .map(str::to_string)
        .collect()
}

/// Run one query against a normalized record set. Rows are returned in file
/// order; no match yields an empty list.
pub fn lookup_cases(set: &RecordSet, mapping: &ColumnMapping, query: &CaseQuery) -> CaseLookupResult {
    let matches = set
        .records(mapping)
        .into_iter()
        .filter(|record| query.matches(record))
        .map(CaseMatch::from)
        .collect();
    CaseLookupResult {
        query: query.clone(),
        matches,
        missing_columns: missing_identifying_columns(set, mapping),
    }
}

//! Column-name normalization and the normalized record set.
//!
//! Every release spells its columns differently (`nonviol` in the Stata file,
//! ` NONVIOL ` in a spreadsheet header). All lookups go through
//! [`normalize_column_name`], so they are case and whitespace insensitive.
//! Lookups are soft: an absent column yields `None`, never an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::failure::nonviolent_column;
use crate::loader::{CellValue, RawTable};
use crate::versions::{ColumnMapping, IndicatorColumn};

/// Canonical form of a column name: trimmed and upper-cased.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalize a whole header row. Idempotent.
pub fn normalize_columns<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    headers
        .iter()
        .map(|h| normalize_column_name(h.as_ref()))
        .collect()
}

/// Normalized tabular content of one loaded release. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
}

impl RecordSet {
    /// Normalize column names of a raw table. Row values are untouched.
    /// When two raw names collapse to the same canonical name the first
    /// column wins lookups.
    pub fn from_raw(raw: RawTable) -> Self {
        let columns = normalize_columns(&raw.headers);
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self {
            columns,
            index,
            rows: raw.rows,
        }
    }

    /// Canonical column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize_column_name(name)).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in column `name`, if both exist.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col)
    }

    pub fn number(&self, row: usize, name: &str) -> Option<f64> {
        self.cell(row, name)?.as_f64()
    }

    pub fn integer(&self, row: usize, name: &str) -> Option<i64> {
        self.cell(row, name)?.as_i64()
    }

    pub fn text(&self, row: usize, name: &str) -> Option<String> {
        self.cell(row, name)?.as_text()
    }

    /// Tri-state flag: `None` when the column or value is missing or the code
    /// is neither sentinel.
    pub fn indicator(&self, row: usize, column: &IndicatorColumn) -> Option<bool> {
        column.decode(self.number(row, column.name)?)
    }

    /// Materialize one row through a release's column mapping.
    pub fn campaign_record(&self, row: usize, mapping: &ColumnMapping) -> CampaignRecord {
        let nonviolent = nonviolent_column(self, mapping);
        self.record_with(row, mapping, nonviolent.as_ref())
    }

    /// Materialize every row through a release's column mapping.
    pub fn records(&self, mapping: &ColumnMapping) -> Vec<CampaignRecord> {
        let nonviolent = nonviolent_column(self, mapping);
        (0..self.len())
            .map(|row| self.record_with(row, mapping, nonviolent.as_ref()))
            .collect()
    }

    fn record_with(
        &self,
        row: usize,
        mapping: &ColumnMapping,
        nonviolent: Option<&IndicatorColumn>,
    ) -> CampaignRecord {
        CampaignRecord {
            row,
            campaign: self.text(row, mapping.campaign),
            year: self.integer(row, mapping.year),
            location: self.text(row, mapping.location),
            nonviolent: nonviolent.and_then(|c| self.indicator(row, c)),
            success: self.indicator(row, &mapping.success),
            log_population: self.number(row, mapping.log_population_column()),
            peak_membership: self.number(row, mapping.peak_membership_column()),
            precomputed_participation: self.number(row, mapping.precomputed_column()),
            size_category: mapping
                .size_category
                .and_then(|c| self.integer(row, c)),
        }
    }
}

/// One row seen through a release's column mapping. Absent columns and
/// missing cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Zero-based data row in file order.
    pub row: usize,
    pub campaign: Option<String>,
    pub year: Option<i64>,
    pub location: Option<String>,
    pub nonviolent: Option<bool>,
    pub success: Option<bool>,
    pub log_population: Option<f64>,
    pub peak_membership: Option<f64>,
    pub precomputed_participation: Option<f64>,
    pub size_category: Option<i64>,
}

//! Selection of failed nonviolent campaigns.
//!
//! A row qualifies when its nonviolent indicator equals the true sentinel and
//! its success indicator equals the false sentinel. Rows with a missing or
//! unrecognised code in either indicator are excluded and counted as
//! ambiguous; they never count for or against the rule.

use serde::{Deserialize, Serialize};

use crate::schema::RecordSet;
use crate::versions::{ColumnMapping, IndicatorColumn};

/// Which nonviolent indicator a record set supports: the primary column, or
/// the release's designated alternate when the primary is absent.
pub fn nonviolent_column(set: &RecordSet, mapping: &ColumnMapping) -> Option<IndicatorColumn> {
    if set.has_column(mapping.nonviolent.name) {
        return Some(mapping.nonviolent);
    }
    mapping
        .nonviolent_fallback
        .filter(|alt| set.has_column(alt.name))
}

/// Rows selected as nonviolent failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSelection {
    /// Indicator column actually used, if any was found.
    pub nonviolent_column: Option<String>,
    /// Whether the alternate indicator stood in for the primary one.
    pub used_fallback: bool,
    /// Selected row indices, in file order.
    pub rows: Vec<usize>,
    /// Rows dropped because an indicator was missing or unrecognised.
    pub ambiguous_rows: usize,
}

impl FailureSelection {
    fn empty(nonviolent_column: Option<String>, used_fallback: bool) -> Self {
        Self {
            nonviolent_column,
            used_fallback,
            rows: Vec::new(),
            ambiguous_rows: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Filter `set` down to nonviolent campaigns that failed.
pub fn select_failures(set: &RecordSet, mapping: &ColumnMapping) -> FailureSelection {
    let Some(nonviolent) = nonviolent_column(set, mapping) else {
        tracing::debug!(
            column = mapping.nonviolent.name,
            "no nonviolent indicator present; selection is empty"
        );
        return FailureSelection::empty(None, false);
    };
    let used_fallback = nonviolent.name != mapping.nonviolent.name;

    if !set.has_column(mapping.success.name) {
        tracing::debug!(
            column = mapping.success.name,
            "no success indicator present; selection is empty"
        );
        return FailureSelection::empty(Some(nonviolent.name.to_string()), used_fallback);
    }

    let mut selection = FailureSelection::empty(Some(nonviolent.name.to_string()), used_fallback);
    for row in 0..set.len() {
        match (
            set.indicator(row, &nonviolent),
            set.indicator(row, &mapping.success),
        ) {
            (Some(true), Some(false)) => selection.rows.push(row),
            (None, _) | (_, None) => selection.ambiguous_rows += 1,
            _ => {}
        }
    }
    selection
}

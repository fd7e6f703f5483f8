//! Per-record participation fractions.
//!
//! Tried in priority order for each release. Both numeric paths are generic:
//! any release whose file carries the columns can use them. A release's
//! [`ColumnMapping`] only renames them; unnamed columns default to `LNPOP`,
//! `PEAKMEMBERSHIP` and `PERCENTAGE POPULAR PARTICIPATION`.
//!
//! 1. **Raw derivation**: log population (thousands, natural log) and peak
//!    membership are both present: `membership / (exp(lnpop) * 1000)`.
//!    Always a fraction. Values above 1 are passed through unclamped.
//! 2. **Precomputed column**: `PERCENTAGE POPULAR PARTICIPATION`. Files
//!    disagree on whether it stores `0.035` or `3.5`, so the scale is decided
//!    once per comparison from the largest candidate value (see
//!    [`ParticipationScale::infer`]) unless the release declares it.
//! 3. **Absent**: nothing usable; every record is unresolved and the
//!    participation-like columns that do exist are reported.

use serde::{Deserialize, Serialize};

use crate::schema::RecordSet;
use crate::versions::ColumnMapping;

/// The rule under audit, as a fraction of population.
pub const RULE_THRESHOLD_FRACTION: f64 = 0.035;

/// The same threshold for columns storing percentage numbers.
pub const RULE_THRESHOLD_PERCENT: f64 = 3.5;

/// Keywords marking a column as participation-like for diagnostics.
pub const PARTICIPATION_KEYWORDS: [&str; 6] = [
    "PARTICIPATION",
    "MEMBERSHIP",
    "PERCENTAGE",
    "PCT",
    "SIZE",
    "PERCENT",
];

/// How a participation number is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationScale {
    /// `0.035` means 3.5%.
    Fraction,
    /// `3.5` means 3.5%.
    PercentageAsNumber,
}

impl ParticipationScale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fraction => "fraction",
            Self::PercentageAsNumber => "percentage_as_number",
        }
    }

    /// Threshold expressed in this scale.
    pub fn threshold(self) -> f64 {
        match self {
            Self::Fraction => RULE_THRESHOLD_FRACTION,
            Self::PercentageAsNumber => RULE_THRESHOLD_PERCENT,
        }
    }

    pub fn to_fraction(self, value: f64) -> f64 {
        match self {
            Self::Fraction => value,
            Self::PercentageAsNumber => value / 100.0,
        }
    }

    /// Magnitude heuristic: anything above 1.0 must be a percentage number.
    ///
    /// A column whose largest value is a percentage below 1 (`0.8` meaning
    /// 0.8%) is misread as a fraction; releases where that matters must
    /// declare their scale explicitly.
    pub fn infer(max_value: f64) -> Self {
        if max_value > 1.0 {
            Self::PercentageAsNumber
        } else {
            Self::Fraction
        }
    }
}

/// A participation number together with the scale it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticipationValue {
    pub value: f64,
    pub scale: ParticipationScale,
}

impl ParticipationValue {
    pub fn fraction(&self) -> f64 {
        self.scale.to_fraction(self.value)
    }

    pub fn meets_threshold(&self) -> bool {
        self.value >= self.scale.threshold()
    }
}

/// Where participation numbers come from for one record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ParticipationSource {
    RawDerivation {
        log_population: String,
        peak_membership: String,
    },
    Precomputed {
        column: String,
        declared_scale: Option<ParticipationScale>,
    },
    Absent {
        participation_like_columns: Vec<String>,
    },
}

/// Per-row participation numbers for one record set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParticipation {
    pub source: ParticipationSource,
    values: Vec<Option<f64>>,
}

impl ResolvedParticipation {
    /// Raw number for `row`, in the source's storage scale.
    pub fn value(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied().flatten()
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.source, ParticipationSource::Absent { .. })
    }

    /// Scale to compare `rows` in. Decided once for the whole comparison so
    /// the threshold always matches the values it is compared against.
    pub fn scale_for(&self, rows: &[usize]) -> ParticipationScale {
        match &self.source {
            ParticipationSource::RawDerivation { .. } | ParticipationSource::Absent { .. } => {
                ParticipationScale::Fraction
            }
            ParticipationSource::Precomputed {
                declared_scale: Some(scale),
                ..
            } => *scale,
            ParticipationSource::Precomputed {
                declared_scale: None,
                ..
            } => {
                let max = rows
                    .iter()
                    .filter_map(|&r| self.value(r))
                    .fold(f64::NEG_INFINITY, f64::max);
                ParticipationScale::infer(max)
            }
        }
    }
}

/// Participation fraction from NAVCO 1.x raw counts.
pub fn derive_from_raw(log_population_thousands: f64, peak_membership: f64) -> f64 {
    peak_membership / (log_population_thousands.exp() * 1000.0)
}

/// Columns whose canonical name contains any participation keyword.
pub fn participation_like_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| PARTICIPATION_KEYWORDS.iter().any(|k| c.contains(*k)))
        .cloned()
        .collect()
}

/// Decide the participation path for `set` and compute per-row values.
pub fn resolve_participation(
    set: &RecordSet,
    mapping: &ColumnMapping,
    declared_scale: Option<ParticipationScale>,
) -> ResolvedParticipation {
    let lnpop = mapping.log_population_column();
    let members = mapping.peak_membership_column();
    if set.has_column(lnpop) && set.has_column(members) {
        let values = (0..set.len())
            .map(|row| {
                let ln = set.number(row, lnpop)?;
                let count = set.number(row, members)?;
                let fraction = derive_from_raw(ln, count);
                fraction.is_finite().then_some(fraction)
            })
            .collect();
        return ResolvedParticipation {
            source: ParticipationSource::RawDerivation {
                log_population: lnpop.to_string(),
                peak_membership: members.to_string(),
            },
            values,
        };
    }

    let precomputed = mapping.precomputed_column();
    if set.has_column(precomputed) {
        let values = (0..set.len())
            .map(|row| set.number(row, precomputed))
            .collect();
        return ResolvedParticipation {
            source: ParticipationSource::Precomputed {
                column: precomputed.to_string(),
                declared_scale,
            },
            values,
        };
    }

    ResolvedParticipation {
        source: ParticipationSource::Absent {
            participation_like_columns: participation_like_columns(set.columns()),
        },
        values: vec![None; set.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{CellValue, RawTable};
    use crate::versions::DatasetVersion;

    fn set(headers: &[&str], rows: &[&[f64]]) -> RecordSet {
        let mut table = RawTable::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| CellValue::Number(*v)).collect());
        }
        RecordSet::from_raw(table)
    }

    #[test]
    fn raw_derivation_formula_is_exact() {
        for (lnpop, members) in [(6.9078, 40_000.0), (10.2, 1_500.0), (0.0, 3.0)] {
            let expected = members / (f64::exp(lnpop) * 1000.0);
            assert_eq!(derive_from_raw(lnpop, members), expected);
        }
    }

    #[test]
    fn raw_path_preferred_when_both_columns_exist() {
        let s = set(
            &["lnpop", "peakmembership", "Percentage Popular Participation"],
            &[&[6.9078, 40_000.0, 99.0]],
        );
        let resolved = resolve_participation(&s, &DatasetVersion::V1_1.descriptor().columns, None);
        assert!(matches!(
            resolved.source,
            ParticipationSource::RawDerivation { .. }
        ));
        let value = resolved.value(0).unwrap();
        assert_eq!(value, derive_from_raw(6.9078, 40_000.0));
        assert_eq!(resolved.scale_for(&[0]), ParticipationScale::Fraction);
    }

    #[test]
    fn raw_values_above_one_pass_through() {
        let s = set(&["LNPOP", "PEAKMEMBERSHIP"], &[&[0.0, 5_000.0]]);
        let resolved = resolve_participation(&s, &DatasetVersion::V1_1.descriptor().columns, None);
        assert_eq!(resolved.value(0), Some(5.0));
    }

    #[test]
    fn only_one_raw_column_falls_through() {
        let s = set(&["LNPOP"], &[&[6.0]]);
        let resolved = resolve_participation(&s, &DatasetVersion::V1_1.descriptor().columns, None);
        assert!(resolved.is_absent());
    }

    #[test]
    fn scale_inferred_from_max_candidate() {
        let s = set(
            &["PERCENTAGE POPULAR PARTICIPATION"],
            &[&[0.08], &[0.01], &[8.0]],
        );
        let resolved = resolve_participation(&s, &DatasetVersion::V1_2.descriptor().columns, None);
        assert_eq!(resolved.scale_for(&[0, 1]), ParticipationScale::Fraction);
        assert_eq!(resolved.scale_for(&[0, 1]).threshold(), 0.035);
        assert_eq!(
            resolved.scale_for(&[1, 2]),
            ParticipationScale::PercentageAsNumber
        );
        assert_eq!(resolved.scale_for(&[1, 2]).threshold(), 3.5);
    }

    #[test]
    fn declared_scale_overrides_heuristic() {
        let s = set(&["PERCENTAGE POPULAR PARTICIPATION"], &[&[0.8]]);
        let resolved = resolve_participation(
            &s,
            &DatasetVersion::V1_2.descriptor().columns,
            Some(ParticipationScale::PercentageAsNumber),
        );
        assert_eq!(
            resolved.scale_for(&[0]),
            ParticipationScale::PercentageAsNumber
        );
    }

    #[test]
    fn precomputed_column_found_for_any_release() {
        let s = set(&["percentage popular participation"], &[&[2.0]]);
        let resolved = resolve_participation(&s, &DatasetVersion::V1_3.descriptor().columns, None);
        assert!(matches!(
            resolved.source,
            ParticipationSource::Precomputed { .. }
        ));
    }

    #[test]
    fn raw_columns_found_for_any_release() {
        let s = set(&["lnpop", "peakmembership"], &[&[6.9078, 40_000.0]]);
        let resolved = resolve_participation(&s, &DatasetVersion::V1_3.descriptor().columns, None);
        assert_eq!(
            resolved.source,
            ParticipationSource::RawDerivation {
                log_population: "LNPOP".to_string(),
                peak_membership: "PEAKMEMBERSHIP".to_string(),
            }
        );
        assert_eq!(resolved.value(0), Some(derive_from_raw(6.9078, 40_000.0)));
    }

    #[test]
    fn non_finite_precomputed_cell_is_unresolved() {
        let mut table = RawTable::new(vec!["PERCENTAGE POPULAR PARTICIPATION".to_string()]);
        table.push_row(vec![CellValue::from_text("2.1")]);
        table.push_row(vec![CellValue::from_text("inf")]);
        table.push_row(vec![CellValue::from_text("1e400")]);
        let s = RecordSet::from_raw(table);
        let resolved = resolve_participation(&s, &DatasetVersion::V1_2.descriptor().columns, None);
        assert_eq!(resolved.value(0), Some(2.1));
        assert_eq!(resolved.value(1), None);
        assert_eq!(resolved.value(2), None);
        assert_eq!(
            resolved.scale_for(&[0, 1, 2]),
            ParticipationScale::PercentageAsNumber
        );
    }

    #[test]
    fn absent_lists_participation_like_columns() {
        let s = set(&["CAMP_SIZE_CAT", "SUCCESS", "PCT_URBAN"], &[&[2.0, 0.0, 40.0]]);
        let resolved = resolve_participation(&s, &DatasetVersion::V2_1.descriptor().columns, None);
        match &resolved.source {
            ParticipationSource::Absent {
                participation_like_columns,
            } => assert_eq!(
                participation_like_columns,
                &vec!["CAMP_SIZE_CAT".to_string(), "PCT_URBAN".to_string()]
            ),
            other => panic!("unexpected source {other:?}"),
        }
        assert_eq!(resolved.value(0), None);
    }

    #[test]
    fn value_conversion_to_fraction() {
        let v = ParticipationValue {
            value: 2.1,
            scale: ParticipationScale::PercentageAsNumber,
        };
        assert!((v.fraction() - 0.021).abs() < 1e-12);
        assert!(!v.meets_threshold());
    }
}

//! 3.5% rule verdict engine.
//!
//! Takes the nonviolent failures of one release together with their resolved
//! participation numbers, picks the failure with the largest participation
//! and compares it against the threshold in the matching scale. Produces a
//! [`VerdictOutcome`]: either a decided verdict naming the campaign it rests
//! on, or an indeterminate record saying why no decision is possible.

use serde::{Deserialize, Serialize};

use crate::failure::FailureSelection;
use crate::participation::{
    participation_like_columns, ParticipationScale, ParticipationSource, ParticipationValue,
    ResolvedParticipation,
};
use crate::schema::RecordSet;
use crate::versions::{ColumnMapping, DatasetVersion};

// ---------------------------------------------------------------------------
// Verdict types
// ---------------------------------------------------------------------------

/// Conclusion for one release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The most-mobilized failure stayed below the threshold.
    RuleHolds,
    /// A failure reached or exceeded the threshold.
    RuleBroken,
    /// No qualifying failure, or no participation data.
    Indeterminate,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuleHolds => "RULE_HOLDS",
            Self::RuleBroken => "RULE_BROKEN",
            Self::Indeterminate => "INDETERMINATE",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a release could not be decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminateReason {
    NoFailures,
    NoParticipationData,
}

impl IndeterminateReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoFailures => "no_failures",
            Self::NoParticipationData => "no_participation_data",
        }
    }
}

/// A decided verdict and the record it rests on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub version: DatasetVersion,
    pub selected_row: usize,
    pub selected_campaign: Option<String>,
    pub selected_year: Option<i64>,
    /// Value as stored, in `scale`.
    pub participation_value: f64,
    /// Same value as a fraction of population.
    pub participation_fraction: f64,
    pub scale: ParticipationScale,
    /// Threshold in `scale`.
    pub threshold_used: f64,
    pub verdict: Verdict,
    /// Number of nonviolent failures considered.
    pub failures_considered: usize,
}

/// A release for which no verdict is possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndeterminateRecord {
    pub version: DatasetVersion,
    pub reason: IndeterminateReason,
    pub found_participation_like_columns: Vec<String>,
}

/// Result of the verdict engine for one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictOutcome {
    Decided(VerdictRecord),
    Indeterminate(IndeterminateRecord),
}

impl VerdictOutcome {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Decided(record) => record.verdict,
            Self::Indeterminate(_) => Verdict::Indeterminate,
        }
    }

    pub fn decided(&self) -> Option<&VerdictRecord> {
        match self {
            Self::Decided(record) => Some(record),
            Self::Indeterminate(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Failure with the largest participation. Ties keep the earliest row.
pub fn select_max_participation(
    failures: &FailureSelection,
    participation: &ResolvedParticipation,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for &row in &failures.rows {
        if let Some(value) = participation.value(row) {
            if best.map_or(true, |(_, current)| value > current) {
                best = Some((row, value));
            }
        }
    }
    best
}

/// Compare a participation value against the threshold of its own scale.
pub fn judge(value: ParticipationValue) -> Verdict {
    if value.meets_threshold() {
        Verdict::RuleBroken
    } else {
        Verdict::RuleHolds
    }
}

/// Evaluate the rule for one release.
pub fn evaluate_verdict(
    version: DatasetVersion,
    set: &RecordSet,
    mapping: &ColumnMapping,
    failures: &FailureSelection,
    participation: &ResolvedParticipation,
) -> VerdictOutcome {
    if let ParticipationSource::Absent {
        participation_like_columns,
    } = &participation.source
    {
        return VerdictOutcome::Indeterminate(IndeterminateRecord {
            version,
            reason: IndeterminateReason::NoParticipationData,
            found_participation_like_columns: participation_like_columns.clone(),
        });
    }

    if failures.is_empty() {
        return VerdictOutcome::Indeterminate(IndeterminateRecord {
            version,
            reason: IndeterminateReason::NoFailures,
            found_participation_like_columns: participation_like_columns(set.columns()),
        });
    }

    let Some((row, raw_value)) = select_max_participation(failures, participation) else {
        return VerdictOutcome::Indeterminate(IndeterminateRecord {
            version,
            reason: IndeterminateReason::NoParticipationData,
            found_participation_like_columns: participation_like_columns(set.columns()),
        });
    };

    let scale = participation.scale_for(&failures.rows);
    let value = ParticipationValue {
        value: raw_value,
        scale,
    };
    let record = set.campaign_record(row, mapping);

    VerdictOutcome::Decided(VerdictRecord {
        version,
        selected_row: row,
        selected_campaign: record.campaign,
        selected_year: record.year,
        participation_value: raw_value,
        participation_fraction: value.fraction(),
        scale,
        threshold_used: scale.threshold(),
        verdict: judge(value),
        failures_considered: failures.rows.len(),
    })
}

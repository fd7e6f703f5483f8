//! End-to-end audit runs over synthetic release files.

use navco_core::{
    analyze_version, run_audit, AuditConfig, DatasetVersion, DirStore, IndeterminateReason,
    MatchField, MemoryStore, ParticipationScale, Verdict, VerdictOutcome, VersionOutcome,
};

const NAVCO_11_CSV: &str = "CAMPAIGN,LOCATION,BYEAR,EYEAR,NONVIOL,SUCCESS,LNPOP,PEAKMEMBERSHIP\n\
Anti-Marcos,Philippines,1983,1986,1,1,10.9,2000000\n\
Small protest,Nowhere,1990,1991,1,0,6.9078,40000\n\
Armed group,Elsewhere,1970,1980,0,0,8.0,90000\n";

const NAVCO_12_CSV: &str = "CAMPAIGN,LOCATION,BYEAR,NONVIOL,SUCCESS,PERCENTAGE POPULAR PARTICIPATION\n\
Failed A,Chile,1983,1,0,2.1\n\
Failed B,Burma,1988,1,0,1.4\n\
Won,Serbia,2000,1,1,5.0\n";

const NAVCO_13_CSV: &str = "CAMPAIGN,LOCATION,BYEAR,NONVIOL,SUCCESS\n\
Hong Kong Umbrella Movement,China,2014,1,0\n\
Other,Elsewhere,2001,0,1\n";

const NAVCO_21_CSV: &str = "LOCATION,YEAR,CAMP_NAME,CAMP_SIZE_CAT,PRIM_METH,SUCCESS\n\
Bahrain,2010,Bahraini opposition,1,1,0\n\
Bahrain,2011,Pearl Roundabout,3,1,0\n";

fn full_store() -> MemoryStore {
    MemoryStore::new()
        .with_file("NAVCO 1.1.csv", NAVCO_11_CSV)
        .with_file("NAVCO 1.2 Updated.csv", NAVCO_12_CSV)
        .with_file("NAVCO 1.3 List.csv", NAVCO_13_CSV)
        .with_file("NAVCO2-1_ForPublication.csv", NAVCO_21_CSV)
}

#[test]
fn raw_counts_release_breaks_rule() {
    let report = analyze_version(&full_store(), DatasetVersion::V1_1, &AuditConfig::default());
    let record = report
        .verdict_outcome()
        .and_then(VerdictOutcome::decided)
        .expect("decided verdict");
    assert_eq!(record.verdict, Verdict::RuleBroken);
    assert_eq!(record.scale, ParticipationScale::Fraction);
    assert_eq!(record.threshold_used, 0.035);
    assert_eq!(record.selected_campaign.as_deref(), Some("Small protest"));
    assert_eq!(record.selected_year, Some(1990));
    assert!((record.participation_value - 0.04).abs() < 1e-4);
    // the successful campaign and the violent one are not failures
    assert_eq!(record.failures_considered, 1);
}

#[test]
fn precomputed_percentage_release_holds() {
    let report = analyze_version(&full_store(), DatasetVersion::V1_2, &AuditConfig::default());
    let record = report
        .verdict_outcome()
        .and_then(VerdictOutcome::decided)
        .expect("decided verdict");
    assert_eq!(record.verdict, Verdict::RuleHolds);
    assert_eq!(record.scale, ParticipationScale::PercentageAsNumber);
    assert_eq!(record.threshold_used, 3.5);
    assert_eq!(record.participation_value, 2.1);
    assert_eq!(record.selected_campaign.as_deref(), Some("Failed A"));
}

#[test]
fn release_without_participation_is_indeterminate() {
    let report = analyze_version(&full_store(), DatasetVersion::V1_3, &AuditConfig::default());
    match report.verdict_outcome() {
        Some(VerdictOutcome::Indeterminate(rec)) => {
            assert_eq!(rec.reason, IndeterminateReason::NoParticipationData);
            assert!(rec.found_participation_like_columns.is_empty());
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // default forensic query still runs
    assert_eq!(report.case_lookups.len(), 1);
    let lookup = &report.case_lookups[0];
    assert_eq!(lookup.query.field, MatchField::Campaign);
    assert_eq!(lookup.matches.len(), 1);
    assert_eq!(lookup.matches[0].success, Some(false));
    assert_eq!(lookup.matches[0].nonviolent, Some(true));
}

#[test]
fn annual_release_reports_size_category_only() {
    let report = analyze_version(&full_store(), DatasetVersion::V2_1, &AuditConfig::default());
    match report.verdict_outcome() {
        Some(VerdictOutcome::Indeterminate(rec)) => {
            assert_eq!(rec.reason, IndeterminateReason::NoParticipationData);
            assert_eq!(
                rec.found_participation_like_columns,
                vec!["CAMP_SIZE_CAT".to_string()]
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.contains("PRIM_METH")));

    let lookup = &report.case_lookups[0];
    assert_eq!(lookup.matches.len(), 1);
    let case = &lookup.matches[0];
    assert_eq!(case.campaign.as_deref(), Some("Pearl Roundabout"));
    assert_eq!(case.size_category, Some(3));
    assert_eq!(case.size_category_label.as_deref(), Some("10,001-100,000"));
}

#[test]
fn one_corrupt_release_does_not_affect_others() {
    let store = MemoryStore::new()
        .with_file("NAVCO 1.1.csv", NAVCO_11_CSV)
        .with_file("NAVCO 1.2 Updated.xlsx", b"definitely not a workbook".to_vec())
        .with_file("NAVCO 1.3 List.csv", NAVCO_13_CSV);
    let report = run_audit(&store, &AuditConfig::default());

    let v12 = report.version(DatasetVersion::V1_2).expect("1.2 present");
    match &v12.outcome {
        VersionOutcome::LoadFailed { detail } => {
            assert!(detail.contains("NAVCO 1.2 Updated.xlsx"))
        }
        other => panic!("expected load failure, got {other:?}"),
    }
    let v21 = report.version(DatasetVersion::V2_1).expect("2.1 present");
    assert!(matches!(v21.outcome, VersionOutcome::Unavailable { .. }));

    assert_eq!(
        report.version(DatasetVersion::V1_1).map(|v| v.verdict()),
        Some(Verdict::RuleBroken)
    );
    assert_eq!(
        report.version(DatasetVersion::V1_3).map(|v| v.verdict()),
        Some(Verdict::Indeterminate)
    );
    assert_eq!(report.evaluated_count(), 2);
    assert_eq!(report.skipped_count(), 2);
}

#[test]
fn oversized_stata_row_count_is_skipped_quickly() {
    // release 114, no variables, 20 million declared rows
    let mut dta = vec![114u8, 2, 1, 0, 0, 0];
    dta.extend(20_000_000u32.to_le_bytes());
    dta.extend([0u8; 81 + 18 + 2 + 5]);
    let store = MemoryStore::new()
        .with_file("NAVCO 1.1.dta", dta)
        .with_file("NAVCO 1.2 Updated.csv", NAVCO_12_CSV);
    let report = run_audit(&store, &AuditConfig::default());

    let v11 = report.version(DatasetVersion::V1_1).expect("1.1 present");
    match &v11.outcome {
        VersionOutcome::LoadFailed { detail } => assert!(detail.contains("20000000 row(s)")),
        other => panic!("expected load failure, got {other:?}"),
    }
    assert_eq!(
        report.version(DatasetVersion::V1_2).map(|v| v.verdict()),
        Some(Verdict::RuleHolds)
    );
}

#[test]
fn infinite_precomputed_cell_cannot_break_rule() {
    let store = MemoryStore::new().with_file(
        "NAVCO 1.2 Updated.csv",
        "CAMPAIGN,BYEAR,NONVIOL,SUCCESS,PERCENTAGE POPULAR PARTICIPATION\n\
A,1990,1,0,2.1\n\
B,1991,1,0,inf\n",
    );
    let report = run_audit(&store, &AuditConfig::default());
    let v12 = report.version(DatasetVersion::V1_2).expect("1.2 present");
    let record = v12
        .verdict_outcome()
        .and_then(VerdictOutcome::decided)
        .expect("decided verdict");
    assert_eq!(record.selected_campaign.as_deref(), Some("A"));
    assert_eq!(record.verdict, Verdict::RuleHolds);

    let json = serde_json::to_value(&report).expect("serialize");
    let result = &json["versions"][1]["outcome"]["result"];
    assert_eq!(result["participation_value"], 2.1);
    assert!(result["participation_fraction"].is_number());
}

#[test]
fn lookup_without_match_is_empty_not_error() {
    let mut config = AuditConfig::default();
    config.case_queries.insert(
        DatasetVersion::V1_3,
        vec![navco_core::CaseQuery::new("Atlantis", MatchField::Any)],
    );
    let report = analyze_version(&full_store(), DatasetVersion::V1_3, &config);
    assert!(!report.outcome.is_skipped());
    assert_eq!(report.case_lookups.len(), 1);
    assert!(report.case_lookups[0].matches.is_empty());
}

#[test]
fn declared_scale_overrides_magnitude_heuristic() {
    // 0.8 meant as 0.8%: the heuristic alone would read it as 80%
    let store = MemoryStore::new().with_file(
        "NAVCO 1.2 Updated.csv",
        "CAMPAIGN,BYEAR,NONVIOL,SUCCESS,PERCENTAGE POPULAR PARTICIPATION\nA,1990,1,0,0.8\n",
    );
    let heuristic = analyze_version(&store, DatasetVersion::V1_2, &AuditConfig::default());
    assert_eq!(heuristic.verdict(), Verdict::RuleBroken);

    let mut config = AuditConfig::default();
    config
        .scale_overrides
        .insert(DatasetVersion::V1_2, ParticipationScale::PercentageAsNumber);
    let declared = analyze_version(&store, DatasetVersion::V1_2, &config);
    assert_eq!(declared.verdict(), Verdict::RuleHolds);
}

#[test]
fn audit_over_directory_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("NAVCO 1.2 Updated.csv"), NAVCO_12_CSV).expect("write");
    std::fs::write(dir.path().join("NAVCO 1.3 List.csv"), NAVCO_13_CSV).expect("write");

    let store = DirStore::new(dir.path());
    let mut config = AuditConfig::default();
    config.restrict_to(&[DatasetVersion::V1_2, DatasetVersion::V1_3]);
    let report = run_audit(&store, &config);

    assert_eq!(report.versions.len(), 2);
    assert_eq!(report.versions[0].version, DatasetVersion::V1_2);
    assert_eq!(report.versions[0].verdict(), Verdict::RuleHolds);
    let source = report.versions[0].source.as_ref().expect("source");
    assert_eq!(source.sha256.len(), 64);
}

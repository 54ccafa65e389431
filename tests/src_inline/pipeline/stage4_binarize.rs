use super::*;
use crate::model::cancel::CancelToken;
use crate::model::config::ThresholdParams;
use crate::model::thresholds::Confidence;
use crate::pipeline::stage3_thresholds::run_stage3;

fn auc() -> AucMatrix {
    let mut low_high: Vec<Option<f32>> = Vec::new();
    for i in 0..30 {
        low_high.push(Some(0.05 + i as f32 * 0.0005));
        low_high.push(Some(0.4 + i as f32 * 0.0005));
    }
    let n = low_high.len();
    let mut flat = vec![Some(0.2f32); n];
    flat[3] = None;
    AucMatrix::new(
        vec!["TF_A".to_string(), "TF_B".to_string()],
        (0..n).map(|c| format!("c{c}")).collect(),
        vec![low_high, flat],
    )
}

fn estimated(auc: &AucMatrix) -> ThresholdSet {
    run_stage3(auc, &ThresholdParams::default_v1(), &CancelToken::new()).unwrap()
}

#[test]
fn test_binarize_row_uses_inclusive_threshold() {
    let row = [Some(0.1), Some(0.2), None, Some(0.3)];
    assert_eq!(
        binarize_row(&row, 0.2),
        vec![Some(0), Some(1), None, Some(1)]
    );
}

#[test]
fn test_estimated_thresholds_split_populations() {
    let auc = auc();
    let thresholds = estimated(&auc);
    assert_eq!(thresholds.get("TF_A").unwrap().confidence, Confidence::Bimodal);

    let out = run_stage4(&auc, &thresholds, &BTreeMap::new()).unwrap();
    let row = &out.binary.values[0];
    for (cell, call) in row.iter().enumerate() {
        let expected = if cell % 2 == 0 { 0 } else { 1 };
        assert_eq!(*call, Some(expected), "cell {cell}");
    }
    assert_eq!(out.binary.active_fraction("TF_A"), Some(0.5));

    // fallback keeps every cell off; the missing AUC stays uncalled
    let flat = &out.binary.values[1];
    assert_eq!(flat[3], None);
    assert!(flat.iter().flatten().all(|&v| v == 0));
    assert_eq!(
        out.binary.applied["TF_A"].source,
        ThresholdSource::Estimated
    );
}

#[test]
fn test_binarization_is_idempotent() {
    let auc = auc();
    let thresholds = estimated(&auc);
    let first = run_stage4(&auc, &thresholds, &BTreeMap::new()).unwrap();
    let again = run_stage4(&auc, &estimated(&auc), &BTreeMap::new()).unwrap();
    assert_eq!(first.binary, again.binary);
}

#[test]
fn test_override_replaces_threshold_and_records_provenance() {
    let auc = auc();
    let thresholds = estimated(&auc);
    let overrides = BTreeMap::from([("TF_B".to_string(), 0.15f32)]);
    let out = run_stage4(&auc, &thresholds, &overrides).unwrap();

    let applied = out.binary.applied["TF_B"];
    assert_eq!(applied.value, 0.15);
    assert_eq!(applied.source, ThresholdSource::Override);
    assert_eq!(out.binary.get("TF_B", "c0"), Some(1));
    assert_eq!(out.binary.get("TF_B", "c3"), None);
    assert_eq!(
        out.binary.applied["TF_A"].source,
        ThresholdSource::Estimated
    );
    // the estimated record is untouched
    assert_eq!(thresholds.get("TF_B").unwrap().source, ThresholdSource::Estimated);
}

#[test]
fn test_invalid_overrides_are_rejected() {
    let auc = auc();
    let thresholds = estimated(&auc);
    let unknown = BTreeMap::from([("TF_Z".to_string(), 0.1f32)]);
    assert!(matches!(
        run_stage4(&auc, &thresholds, &unknown),
        Err(ScoringError::Configuration(_))
    ));
    let nan = BTreeMap::from([("TF_A".to_string(), f32::NAN)]);
    assert!(matches!(
        run_stage4(&auc, &thresholds, &nan),
        Err(ScoringError::Configuration(_))
    ));
}

#[test]
fn test_missing_threshold_leaves_row_uncalled() {
    let auc = auc();
    let mut thresholds = estimated(&auc);
    thresholds.thresholds.remove("TF_A");
    let out = run_stage4(&auc, &thresholds, &BTreeMap::new()).unwrap();
    assert!(out.binary.values[0].iter().all(|v| v.is_none()));
    assert!(!out.binary.applied.contains_key("TF_A"));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, "missing_threshold");
    assert_eq!(out.binary.active_fraction("TF_A"), None);
}

#[test]
fn test_apply_override_touches_one_regulon() {
    let auc = auc();
    let thresholds = estimated(&auc);
    let mut binary = run_stage4(&auc, &thresholds, &BTreeMap::new()).unwrap().binary;
    let before_a = binary.values[0].clone();

    binary.apply_override(&auc, "TF_B", 0.1).unwrap();
    assert_eq!(binary.values[0], before_a);
    assert_eq!(binary.get("TF_B", "c1"), Some(1));
    assert_eq!(binary.applied["TF_B"].source, ThresholdSource::Override);

    assert!(binary.apply_override(&auc, "nope", 0.1).is_err());
    assert!(binary.apply_override(&auc, "TF_A", f32::INFINITY).is_err());
}

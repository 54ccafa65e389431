use super::*;

fn bimodal_values() -> Vec<f32> {
    let mut values = Vec::with_capacity(100);
    for i in 0..50 {
        values.push(0.04 + i as f32 * 0.0004);
    }
    for i in 0..50 {
        values.push(0.29 + i as f32 * 0.0004);
    }
    values
}

fn unimodal_with_outlier() -> Vec<f32> {
    let mut values: Vec<f32> = (0..99).map(|i| 0.005 + i as f32 * 0.0001).collect();
    values.push(0.5);
    values
}

fn auc_matrix(rows: Vec<(&str, Vec<f32>)>) -> AucMatrix {
    let n_cells = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let regulons = rows.iter().map(|(n, _)| n.to_string()).collect();
    let values = rows
        .into_iter()
        .map(|(_, v)| {
            let mut row: Vec<Option<f32>> = v.into_iter().map(Some).collect();
            row.resize(n_cells, None);
            row
        })
        .collect();
    AucMatrix::new(
        regulons,
        (0..n_cells).map(|c| format!("c{c}")).collect(),
        values,
    )
}

#[test]
fn test_bimodal_threshold_separates_populations() {
    let params = ThresholdParams::default_v1();
    let t = estimate_threshold("TF", &bimodal_values(), &params).unwrap();
    assert_eq!(t.confidence, Confidence::Bimodal);
    assert_eq!(t.selected, CandidateKind::DensityCrossing);
    assert_eq!(t.source, ThresholdSource::Estimated);
    assert!(t.value > 0.06 && t.value < 0.29, "threshold {}", t.value);

    let fit = t.fit.unwrap();
    assert!(fit.converged);
    assert!(fit.means[0] < fit.means[1]);
    assert!((fit.weights[0] - 0.5).abs() < 0.01);
    assert!(fit.separation() > params.min_separation);

    assert!(t.candidate(CandidateKind::LowerTail).is_some());
    assert!(t.candidate(CandidateKind::GlobalMeanSd).is_some());
    let fallback = t.candidate(CandidateKind::Fallback).unwrap();
    assert!(fallback > 0.3096);
}

#[test]
fn test_minor_component_below_weight_is_not_bimodal() {
    let params = ThresholdParams::default_v1();
    let values = unimodal_with_outlier();
    let t = estimate_threshold("TF", &values, &params).unwrap();
    assert_eq!(t.confidence, Confidence::NotBimodal);
    assert_eq!(t.selected, CandidateKind::Fallback);
    assert!(t.value > 0.5);
    assert!(values.iter().all(|&v| v < t.value));
}

#[test]
fn test_too_few_cells_is_insufficient_data() {
    let params = ThresholdParams::default_v1();
    let err = estimate_threshold("TF", &[0.2], &params).unwrap_err();
    assert!(matches!(err, ScoringError::InsufficientData { .. }));
}

#[test]
fn test_constant_values_are_insufficient_data() {
    let params = ThresholdParams::default_v1();
    let err = estimate_threshold("TF", &[0.1; 20], &params).unwrap_err();
    assert!(matches!(err, ScoringError::InsufficientData { .. }));
}

#[test]
fn test_estimation_is_deterministic() {
    let params = ThresholdParams::default_v1();
    let a = estimate_threshold("TF", &bimodal_values(), &params).unwrap();
    let b = estimate_threshold("TF", &bimodal_values(), &params).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_density_crossing_of_symmetric_mixture() {
    let fit = MixtureFit {
        weights: [0.5, 0.5],
        means: [0.0, 2.0],
        sds: [1.0, 1.0],
        iterations: 1,
        converged: true,
        log_likelihood: 0.0,
    };
    let x = density_crossing(&fit).unwrap();
    assert!((x - 1.0).abs() < 1e-9);

    let skewed = MixtureFit {
        weights: [0.6, 0.4],
        ..fit
    };
    let x = density_crossing(&skewed).unwrap();
    assert!(x > 1.0 && x < 2.0);

    let empty = MixtureFit {
        weights: [1.0, 0.0],
        ..fit
    };
    assert_eq!(density_crossing(&empty), None);
}

#[test]
fn test_run_stage3_records_diagnostics() {
    let auc = auc_matrix(vec![
        ("bimodal", bimodal_values()),
        ("flat", vec![0.1; 100]),
        ("skewed", unimodal_with_outlier()),
    ]);
    let set = run_stage3(&auc, &ThresholdParams::default_v1(), &CancelToken::new()).unwrap();
    assert!(!set.cancelled);
    assert_eq!(set.thresholds.len(), 3);
    assert_eq!(set.n_confident(), 1);

    let flat = set.get("flat").unwrap();
    assert_eq!(flat.confidence, Confidence::InsufficientData);
    assert_eq!(flat.selected, CandidateKind::Fallback);
    assert!(flat.value > 0.1);
    assert!(flat.fit.is_none());

    let kinds: Vec<(&str, &str)> = set
        .diagnostics
        .iter()
        .map(|d| (d.entity.as_str(), d.kind))
        .collect();
    assert!(kinds.contains(&("flat", "insufficient_data")));
    assert!(kinds.contains(&("skewed", "not_bimodal")));
    assert!(!kinds.iter().any(|(e, _)| *e == "bimodal"));
}

#[test]
fn test_run_stage3_ignores_missing_entries() {
    let mut auc = auc_matrix(vec![("bimodal", bimodal_values())]);
    auc.values[0][0] = None;
    let set = run_stage3(&auc, &ThresholdParams::default_v1(), &CancelToken::new()).unwrap();
    assert_eq!(set.get("bimodal").unwrap().confidence, Confidence::Bimodal);
}

#[test]
fn test_run_stage3_rejects_invalid_params() {
    let auc = auc_matrix(vec![("bimodal", bimodal_values())]);
    let mut params = ThresholdParams::default_v1();
    params.max_iter = 0;
    assert!(matches!(
        run_stage3(&auc, &params, &CancelToken::new()),
        Err(ScoringError::Configuration(_))
    ));
}

#[test]
fn test_run_stage3_cancelled() {
    let auc = auc_matrix(vec![("bimodal", bimodal_values())]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let set = run_stage3(&auc, &ThresholdParams::default_v1(), &cancel).unwrap();
    assert!(set.cancelled);
    assert!(set.thresholds.is_empty());
}

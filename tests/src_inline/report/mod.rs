use std::collections::BTreeMap;

use super::*;
use crate::model::matrices::AppliedThreshold;
use crate::model::rss::{RssRow, RssTable};
use crate::model::thresholds::ThresholdSource;
use crate::regulons::{ExclusionReason, RegulonAudit};

#[test]
fn test_quantiles() {
    let v = vec![1.0f32, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(median(&v), 3.0);
    assert_eq!(p90(&v), 5.0);
    assert_eq!(median(&[]), 0.0);
}

#[test]
fn test_format_missing_values() {
    assert_eq!(format_opt_f32(None), "NA");
    assert_eq!(format_opt_f32(Some(0.25)), "0.250000");
}

fn binary() -> BinaryMatrix {
    BinaryMatrix::new(
        vec!["R1".to_string()],
        vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
        vec![vec![Some(1), None, Some(0)]],
        BTreeMap::from([(
            "R1".to_string(),
            AppliedThreshold {
                value: 0.2,
                source: ThresholdSource::Override,
            },
        )]),
    )
}

#[test]
fn test_binary_tsv_marks_missing_calls() {
    let text = tsv::render_binary_tsv(&binary());
    assert_eq!(text, "regulon\tc1\tc2\tc3\nR1\t1\tNA\t0\n");
}

#[test]
fn test_auc_tsv_layout() {
    let auc = AucMatrix::new(
        vec!["R1".to_string()],
        vec!["c1".to_string(), "c2".to_string()],
        vec![vec![Some(0.5), None]],
    );
    assert_eq!(
        tsv::render_auc_tsv(&auc),
        "regulon\tc1\tc2\nR1\t0.500000\tNA\n"
    );
}

#[test]
fn test_thresholds_tsv_without_estimate() {
    let thresholds = ThresholdSet {
        thresholds: BTreeMap::new(),
        diagnostics: Vec::new(),
        cancelled: false,
    };
    let text = tsv::render_thresholds_tsv(&thresholds, &binary());
    let line = text.lines().nth(1).unwrap();
    assert_eq!(line, "R1\t0.200000\toverride\tNA\tNA\t");
}

#[test]
fn test_rss_and_audit_tsv() {
    let rss = RssTable::new(
        vec![
            RssRow {
                regulon: "R1".to_string(),
                category: "T".to_string(),
                n_cells: 4,
                score: Some(0.75),
            },
            RssRow {
                regulon: "R1".to_string(),
                category: "B".to_string(),
                n_cells: 1,
                score: None,
            },
        ],
        Vec::new(),
        false,
    );
    assert_eq!(
        tsv::render_rss_tsv(&rss),
        "regulon\tcategory\tn_cells\trss\nR1\tT\t4\t0.750000\nR1\tB\t1\tNA\n"
    );

    let audits = vec![RegulonAudit {
        regulon: "R2".to_string(),
        size_defined: 3,
        size_scored: 1,
        missing_genes: vec!["X".to_string(), "Y".to_string()],
        excluded: Some(ExclusionReason::BelowMinSize),
    }];
    let text = tsv::render_audits_tsv(&audits);
    assert_eq!(text.lines().nth(1), Some("R2\t3\t1\t2\tBelowMinSize\tX,Y"));
}

#[test]
fn test_regulon_stats_summarize_rows() {
    let auc = AucMatrix::new(
        vec!["R1".to_string()],
        vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
        vec![vec![Some(0.4), None, Some(0.1)]],
    );
    let thresholds = ThresholdSet {
        thresholds: BTreeMap::new(),
        diagnostics: Vec::new(),
        cancelled: false,
    };
    let stats = regulon_stats(&auc, &thresholds, &binary());
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].n_scored, 2);
    assert_eq!(stats[0].max, 0.4);
    assert_eq!(stats[0].threshold, Some(0.2));
    assert_eq!(stats[0].confidence, None);
    assert_eq!(stats[0].active_fraction, Some(0.5));
}

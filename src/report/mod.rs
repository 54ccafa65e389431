pub mod json;
pub mod text;
pub mod tsv;

use serde::Serialize;

use crate::model::matrices::{AucMatrix, BinaryMatrix};
use crate::model::thresholds::{Confidence, ThresholdSet};

/// Distribution summary of one regulon's AUC plus its binarization outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RegulonStats {
    pub regulon: String,
    pub n_scored: usize,
    pub median: f32,
    pub p90: f32,
    pub max: f32,
    pub threshold: Option<f32>,
    pub confidence: Option<Confidence>,
    pub active_fraction: Option<f32>,
}

pub fn regulon_stats(
    auc: &AucMatrix,
    thresholds: &ThresholdSet,
    binary: &BinaryMatrix,
) -> Vec<RegulonStats> {
    auc.regulons
        .iter()
        .enumerate()
        .map(|(row, regulon)| {
            let values = auc.computed_values(row);
            RegulonStats {
                regulon: regulon.clone(),
                n_scored: values.len(),
                median: median(&values),
                p90: p90(&values),
                max: values.iter().copied().fold(0.0, f32::max),
                threshold: binary.applied.get(regulon).map(|t| t.value),
                confidence: thresholds.get(regulon).map(|t| t.confidence),
                active_fraction: binary.active_fraction(regulon),
            }
        })
        .collect()
}

pub fn format_f32_6(v: f32) -> String {
    format!("{:.6}", v)
}

pub fn format_opt_f32(v: Option<f32>) -> String {
    match v {
        Some(v) => format_f32_6(v),
        None => "NA".to_string(),
    }
}

pub fn quantile_indexed(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() - 1) as f32 * p).ceil() as usize;
    sorted[idx]
}

pub fn median(values: &[f32]) -> f32 {
    quantile_indexed(values, 0.5)
}

pub fn p90(values: &[f32]) -> f32 {
    quantile_indexed(values, 0.90)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;

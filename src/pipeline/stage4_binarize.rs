use std::collections::BTreeMap;

use crate::error::ScoringError;
use crate::model::diagnostics::{Diagnostic, Stage};
use crate::model::matrices::{AppliedThreshold, AucMatrix, BinaryMatrix};
use crate::model::thresholds::{ThresholdSet, ThresholdSource};

#[derive(Debug)]
pub struct Stage4Output {
    pub binary: BinaryMatrix,
    pub diagnostics: Vec<Diagnostic>,
}

/// Calls each cell on (1) when its AUC is at least the regulon's threshold.
///
/// `overrides` replaces the estimated threshold for the named regulons; their
/// provenance is recorded as [`ThresholdSource::Override`]. Overrides naming
/// unknown regulons or carrying non-finite values are rejected.
pub fn run_stage4(
    auc: &AucMatrix,
    thresholds: &ThresholdSet,
    overrides: &BTreeMap<String, f32>,
) -> Result<Stage4Output, ScoringError> {
    for (regulon, value) in overrides {
        if auc.regulon_index(regulon).is_none() {
            return Err(ScoringError::Configuration(format!(
                "threshold override for unknown regulon {regulon}"
            )));
        }
        if !value.is_finite() {
            return Err(ScoringError::Configuration(format!(
                "threshold override for {regulon} is not finite"
            )));
        }
    }

    let mut applied = BTreeMap::new();
    let mut diagnostics = Vec::new();
    let mut values = Vec::with_capacity(auc.n_regulons());

    for (row, regulon) in auc.regulons.iter().enumerate() {
        let threshold = match overrides.get(regulon) {
            Some(&value) => Some(AppliedThreshold {
                value,
                source: ThresholdSource::Override,
            }),
            None => thresholds.get(regulon).map(|t| AppliedThreshold {
                value: t.value,
                source: t.source,
            }),
        };
        match threshold {
            Some(t) => {
                values.push(binarize_row(&auc.values[row], t.value));
                applied.insert(regulon.clone(), t);
            }
            None => {
                tracing::warn!(regulon = %regulon, "no threshold available; row left uncalled");
                diagnostics.push(Diagnostic::note(
                    Stage::Binarize,
                    regulon,
                    "missing_threshold",
                    "no estimated or override threshold".to_string(),
                ));
                values.push(vec![None; auc.n_cells()]);
            }
        }
    }

    tracing::info!(
        regulons = applied.len(),
        overrides = overrides.len(),
        "regulon activity binarized"
    );

    Ok(Stage4Output {
        binary: BinaryMatrix::new(auc.regulons.clone(), auc.cells.clone(), values, applied),
        diagnostics,
    })
}

pub fn binarize_row(row: &[Option<f32>], threshold: f32) -> Vec<Option<u8>> {
    row.iter()
        .map(|v| v.map(|auc| u8::from(auc >= threshold)))
        .collect()
}

impl BinaryMatrix {
    /// Re-binarizes one regulon with a manual threshold, leaving every other
    /// row untouched.
    pub fn apply_override(
        &mut self,
        auc: &AucMatrix,
        regulon: &str,
        threshold: f32,
    ) -> Result<(), ScoringError> {
        if !threshold.is_finite() {
            return Err(ScoringError::Configuration(format!(
                "threshold override for {regulon} is not finite"
            )));
        }
        let (Some(row), Some(src)) = (self.regulon_index(regulon), auc.regulon_index(regulon))
        else {
            return Err(ScoringError::Configuration(format!(
                "threshold override for unknown regulon {regulon}"
            )));
        };
        if auc.cells != self.cells {
            return Err(ScoringError::InvalidInput(
                "AUC matrix cells differ from the binary matrix".to_string(),
            ));
        }
        self.values[row] = binarize_row(&auc.values[src], threshold);
        self.applied.insert(
            regulon.to_string(),
            AppliedThreshold {
                value: threshold,
                source: ThresholdSource::Override,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_binarize.rs"]
mod tests;

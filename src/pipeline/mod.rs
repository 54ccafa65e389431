pub mod stage1_rank;
pub mod stage2_auc;
pub mod stage3_thresholds;
pub mod stage4_binarize;
pub mod stage5_rss;
pub mod stage6_report;

use std::collections::BTreeMap;

use crate::error::ScoringError;
use crate::model::cancel::CancelToken;
use crate::model::config::ScoringConfig;
use crate::model::diagnostics::Diagnostic;
use crate::model::expression::ExpressionMatrix;
use crate::model::matrices::{AucMatrix, BinaryMatrix};
use crate::model::rss::{CellAnnotation, RssTable};
use crate::model::thresholds::ThresholdSet;
use crate::regulons::mapping::prepare_regulons;
use crate::regulons::{Regulon, RegulonAudit};

use stage1_rank::run_stage1;
use stage2_auc::run_stage2;
use stage3_thresholds::run_stage3;
use stage4_binarize::run_stage4;
use stage5_rss::run_stage5;

#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub expr: &'a ExpressionMatrix,
    pub regulons: &'a [Regulon],
    pub annotation: Option<&'a CellAnnotation>,
    pub overrides: &'a BTreeMap<String, f32>,
}

#[derive(Debug)]
pub struct ScoringOutput {
    pub audits: Vec<RegulonAudit>,
    pub cutoff_rank: usize,
    pub auc: AucMatrix,
    pub thresholds: ThresholdSet,
    pub binary: BinaryMatrix,
    pub rss: Option<RssTable>,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
}

impl ScoringOutput {
    /// Fails with [`ScoringError::Cancelled`] when any stage stopped early.
    pub fn complete(self) -> Result<Self, ScoringError> {
        if self.cancelled {
            return Err(ScoringError::Cancelled);
        }
        Ok(self)
    }
}

/// Runs ranking, AUC scoring, threshold estimation, binarization and, when an
/// annotation is supplied, RSS.
///
/// Configuration problems fail before any work starts. Per-regulon problems
/// are collected in `diagnostics`. After cancellation the stages that already
/// ran keep their completed entries and later stages see the gaps as missing
/// values.
pub fn run_scoring(
    input: &ScoringInput<'_>,
    config: &ScoringConfig,
    cancel: &CancelToken,
) -> Result<ScoringOutput, ScoringError> {
    config.validate()?;

    let prepared = prepare_regulons(input.expr, input.regulons, &config.auc);
    let mut diagnostics = prepared.diagnostics.clone();
    tracing::info!(
        defined = input.regulons.len(),
        scorable = prepared.scorable.len(),
        "regulons prepared"
    );

    let stage1 = run_stage1(input.expr, cancel);
    let stage2 = run_stage2(&stage1.rankings, &prepared.scorable, &config.auc, cancel)?;
    let thresholds = run_stage3(&stage2.auc, &config.thresholds, cancel)?;
    diagnostics.extend(thresholds.diagnostics.iter().cloned());

    let stage4 = run_stage4(&stage2.auc, &thresholds, input.overrides)?;
    diagnostics.extend(stage4.diagnostics);

    let rss = match input.annotation {
        Some(annotation) => {
            let table = run_stage5(&stage2.auc, annotation, &config.rss, cancel)?;
            diagnostics.extend(table.diagnostics.iter().cloned());
            Some(table)
        }
        None => None,
    };

    let cancelled = stage1.cancelled
        || stage2.cancelled
        || thresholds.cancelled
        || rss.as_ref().is_some_and(|t| t.cancelled);

    Ok(ScoringOutput {
        audits: prepared.audits,
        cutoff_rank: stage2.cutoff_rank,
        auc: stage2.auc,
        thresholds,
        binary: stage4.binary,
        rss,
        diagnostics,
        cancelled,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;

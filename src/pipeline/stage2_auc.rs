use rayon::prelude::*;

use crate::error::ScoringError;
use crate::model::cancel::CancelToken;
use crate::model::config::{AucParams, RecoveryStatistic};
use crate::model::matrices::{AucMatrix, RankMatrix};
use crate::regulons::ScorableRegulon;

#[derive(Debug)]
pub struct Stage2Output {
    pub auc: AucMatrix,
    pub cutoff_rank: usize,
    pub cells_completed: usize,
    pub cancelled: bool,
}

/// Scores every regulon in every ranked cell.
///
/// Work is split per cell; within a cell each regulon costs one rank lookup
/// per member gene. Cells without a ranking, or reached after cancellation,
/// stay `None` in every row.
pub fn run_stage2(
    rankings: &RankMatrix,
    regulons: &[ScorableRegulon],
    params: &AucParams,
    cancel: &CancelToken,
) -> Result<Stage2Output, ScoringError> {
    let cutoff = params.cutoff_rank(rankings.n_genes())?;
    let n_genes = rankings.n_genes() as u32;
    for regulon in regulons {
        if regulon.genes.is_empty() {
            return Err(ScoringError::EmptyRegulon {
                regulon: regulon.name.clone(),
                dropped: 0,
            });
        }
        if let Some(&bad) = regulon.genes.iter().find(|&&g| g >= n_genes) {
            return Err(ScoringError::InvalidInput(format!(
                "regulon {} references gene index {} outside the ranking",
                regulon.name, bad
            )));
        }
    }

    let columns: Vec<Option<Vec<f32>>> = (0..rankings.n_cells())
        .into_par_iter()
        .map(|cell| {
            if cancel.is_cancelled() {
                return None;
            }
            let ranks = rankings.cell_ranks(cell)?;
            Some(
                regulons
                    .iter()
                    .map(|r| recovery_auc(ranks, &r.genes, cutoff, params.statistic))
                    .collect(),
            )
        })
        .collect();

    let cells_completed = columns.iter().filter(|c| c.is_some()).count();
    let cancelled = cancel.is_cancelled() && cells_completed < rankings.n_cells();

    let mut values = vec![vec![None; rankings.n_cells()]; regulons.len()];
    for (cell, column) in columns.into_iter().enumerate() {
        if let Some(column) = column {
            for (row, auc) in column.into_iter().enumerate() {
                values[row][cell] = Some(auc);
            }
        }
    }

    if cancelled {
        tracing::warn!(
            completed = cells_completed,
            total = rankings.n_cells(),
            "AUC scoring cancelled; remaining cells left unscored"
        );
    } else {
        tracing::info!(
            regulons = regulons.len(),
            cells = cells_completed,
            cutoff,
            "regulon AUC computed"
        );
    }

    Ok(Stage2Output {
        auc: AucMatrix::new(
            regulons.iter().map(|r| r.name.clone()).collect(),
            rankings.cells.clone(),
            values,
        ),
        cutoff_rank: cutoff,
        cells_completed,
        cancelled,
    })
}

/// Recovery statistic for one regulon in one cell.
///
/// `ranks` maps gene index to 1-based rank. The denominator uses
/// `k = min(|regulon|, R)` so a perfect recovery scores 1.
pub fn recovery_auc(
    ranks: &[u32],
    genes: &[u32],
    cutoff: usize,
    statistic: RecoveryStatistic,
) -> f32 {
    let k = genes.len().min(cutoff);
    if k == 0 {
        return 0.0;
    }
    let hits = genes
        .iter()
        .map(|&g| ranks[g as usize] as u64)
        .filter(|&r| r as usize <= cutoff);

    match statistic {
        RecoveryStatistic::HitFraction => hits.count() as f32 / k as f32,
        RecoveryStatistic::Area => {
            // A hit at rank r raises the step curve for ranks r..=R.
            let r_max = cutoff as u64;
            let area: u64 = hits.map(|r| r_max - r + 1).sum();
            let k = k as u64;
            let max_area = k * r_max - k * (k - 1) / 2;
            (area as f64 / max_area as f64) as f32
        }
    }
}

/// Unnormalized recovery count: regulon genes ranked within `cutoff`.
pub fn recovered_count(ranks: &[u32], genes: &[u32], cutoff: usize) -> usize {
    genes
        .iter()
        .filter(|&&g| ranks[g as usize] as usize <= cutoff)
        .count()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_auc.rs"]
mod tests;

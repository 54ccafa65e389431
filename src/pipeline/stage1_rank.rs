use rayon::prelude::*;

use crate::model::cancel::CancelToken;
use crate::model::expression::ExpressionMatrix;
use crate::model::matrices::RankMatrix;

#[derive(Debug)]
pub struct Stage1Output {
    pub rankings: RankMatrix,
    pub cancelled: bool,
}

/// Ranks genes within every cell by descending expression (rank 1 = highest).
///
/// Ties, including the zero block of sparse cells, are ordered by ascending
/// gene identifier, so identical input always gives identical ranks no matter
/// how the genes are ordered in the matrix. Cells are ranked in parallel.
/// Value validity is checked when the [`ExpressionMatrix`] is built.
pub fn run_stage1(expr: &ExpressionMatrix, cancel: &CancelToken) -> Stage1Output {
    let tie_order = identifier_order(expr.genes());
    let mut tie_key = vec![0u32; expr.n_genes()];
    for (pos, &gene) in tie_order.iter().enumerate() {
        tie_key[gene as usize] = pos as u32;
    }

    let ranks: Vec<Option<Vec<u32>>> = (0..expr.n_cells())
        .into_par_iter()
        .map(|cell| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(rank_cell(expr.column(cell), &tie_order, &tie_key))
        })
        .collect();

    let completed = ranks.iter().filter(|r| r.is_some()).count();
    let cancelled = completed < expr.n_cells();
    if cancelled {
        tracing::warn!(completed, total = expr.n_cells(), "ranking cancelled");
    } else {
        tracing::info!(cells = expr.n_cells(), genes = expr.n_genes(), "cells ranked");
    }

    Stage1Output {
        rankings: RankMatrix {
            genes: expr.genes().to_vec(),
            cells: expr.cells().to_vec(),
            ranks,
        },
        cancelled,
    }
}

/// Gene indices sorted by identifier.
fn identifier_order(genes: &[String]) -> Vec<u32> {
    let mut order: Vec<u32> = (0..genes.len() as u32).collect();
    order.sort_by(|&a, &b| genes[a as usize].cmp(&genes[b as usize]));
    order
}

fn rank_cell(column: &[(u32, f32)], tie_order: &[u32], tie_key: &[u32]) -> Vec<u32> {
    let n_genes = tie_order.len();
    let mut ranks = vec![0u32; n_genes];

    let mut expressed: Vec<(u32, f32)> = column.to_vec();
    expressed.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| tie_key[a.0 as usize].cmp(&tie_key[b.0 as usize]))
    });

    let mut next = 1u32;
    for &(gene, _) in &expressed {
        ranks[gene as usize] = next;
        next += 1;
    }
    for &gene in tie_order {
        if ranks[gene as usize] == 0 {
            ranks[gene as usize] = next;
            next += 1;
        }
    }
    ranks
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_rank.rs"]
mod tests;

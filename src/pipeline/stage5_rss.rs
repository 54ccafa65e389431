use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::ScoringError;
use crate::model::cancel::CancelToken;
use crate::model::config::RssParams;
use crate::model::diagnostics::{Diagnostic, Stage};
use crate::model::matrices::AucMatrix;
use crate::model::rss::{CellAnnotation, RssRow, RssTable};

/// Regulon specificity score for every (regulon, category) pair.
///
/// Only cells that carry a label and a computed AUC take part. Categories
/// with fewer than `min_category_cells` such cells, and regulons whose AUC
/// sums to zero over those cells, get an undefined (`None`) score.
pub fn run_stage5(
    auc: &AucMatrix,
    annotation: &CellAnnotation,
    params: &RssParams,
    cancel: &CancelToken,
) -> Result<RssTable, ScoringError> {
    params.validate()?;

    let categories = annotation.categories();
    let cat_index: BTreeMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let labelled: Vec<(usize, usize)> = auc
        .cells
        .iter()
        .enumerate()
        .filter_map(|(cell, id)| {
            annotation
                .label(id)
                .and_then(|l| cat_index.get(l))
                .map(|&cat| (cell, cat))
        })
        .collect();
    if labelled.is_empty() {
        return Err(ScoringError::InvalidInput(
            "no scored cell carries a category label".to_string(),
        ));
    }

    let mut diagnostics = Vec::new();
    let mut overall = vec![0usize; categories.len()];
    for &(_, cat) in &labelled {
        overall[cat] += 1;
    }
    for (cat, &n) in overall.iter().enumerate() {
        if n < params.min_category_cells {
            diagnostics.push(Diagnostic::note(
                Stage::Rss,
                &categories[cat],
                "small_category",
                format!(
                    "{} cells, at least {} required; score undefined",
                    n, params.min_category_cells
                ),
            ));
        }
    }

    let per_regulon: Vec<Option<(Vec<RssRow>, Option<Diagnostic>)>> = (0..auc.n_regulons())
        .into_par_iter()
        .map(|row| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(score_regulon(
                &auc.regulons[row],
                &auc.values[row],
                &labelled,
                &categories,
                params,
            ))
        })
        .collect();

    let mut rows = Vec::with_capacity(auc.n_regulons() * categories.len());
    let mut cancelled = false;
    for result in per_regulon {
        match result {
            Some((regulon_rows, diagnostic)) => {
                rows.extend(regulon_rows);
                diagnostics.extend(diagnostic);
            }
            None => cancelled = true,
        }
    }

    tracing::info!(
        regulons = auc.n_regulons(),
        categories = categories.len(),
        cells = labelled.len(),
        "regulon specificity scored"
    );

    Ok(RssTable::new(rows, diagnostics, cancelled))
}

fn score_regulon(
    regulon: &str,
    values: &[Option<f32>],
    labelled: &[(usize, usize)],
    categories: &[String],
    params: &RssParams,
) -> (Vec<RssRow>, Option<Diagnostic>) {
    let mut activity = Vec::with_capacity(labelled.len());
    let mut cats = Vec::with_capacity(labelled.len());
    for &(cell, cat) in labelled {
        if let Some(v) = values[cell] {
            activity.push(v as f64);
            cats.push(cat);
        }
    }
    let mut sizes = vec![0usize; categories.len()];
    for &cat in &cats {
        sizes[cat] += 1;
    }

    let total: f64 = activity.iter().sum();
    let diagnostic = if total <= 0.0 {
        let err = ScoringError::InsufficientData {
            regulon: regulon.to_string(),
            reason: "AUC sums to zero over annotated cells".to_string(),
        };
        Some(Diagnostic::from_error(Stage::Rss, regulon, &err))
    } else {
        None
    };

    let rows = categories
        .iter()
        .enumerate()
        .map(|(cat, category)| {
            let score = if diagnostic.is_some() || sizes[cat] < params.min_category_cells {
                None
            } else {
                let members: Vec<bool> = cats.iter().map(|&c| c == cat).collect();
                rss_score(&activity, &members).map(|s| s as f32)
            };
            RssRow {
                regulon: regulon.to_string(),
                category: category.clone(),
                n_cells: sizes[cat],
                score,
            }
        })
        .collect();

    (rows, diagnostic)
}

/// `1 - sqrt(JSD(P, Q))` where `P` is `activity` normalized to sum 1 and `Q`
/// is the normalized membership indicator. Base-2 logarithms keep the
/// divergence, and the score, in [0, 1]. Returns `None` when either
/// distribution is empty.
pub fn rss_score(activity: &[f64], members: &[bool]) -> Option<f64> {
    let total: f64 = activity.iter().sum();
    let n_members = members.iter().filter(|&&m| m).count();
    if total <= 0.0 || n_members == 0 || activity.len() != members.len() {
        return None;
    }
    let q_member = 1.0 / n_members as f64;

    let mut jsd = 0.0;
    for (&a, &member) in activity.iter().zip(members) {
        let p = a / total;
        let q = if member { q_member } else { 0.0 };
        let m = 0.5 * (p + q);
        if p > 0.0 {
            jsd += 0.5 * p * (p / m).log2();
        }
        if q > 0.0 {
            jsd += 0.5 * q * (q / m).log2();
        }
    }
    let jsd = jsd.clamp(0.0, 1.0);
    Some(1.0 - jsd.sqrt())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_rss.rs"]
mod tests;

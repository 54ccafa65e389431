use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::ScoringError;
use crate::input::features::normalize_symbol;
use crate::model::config::AucParams;
use crate::model::diagnostics::{Diagnostic, Stage};
use crate::model::expression::ExpressionMatrix;
use crate::regulons::{
    ExclusionReason, PreparedRegulons, Regulon, RegulonAudit, ScorableRegulon, empty_regulon,
};

/// Resolves regulon gene identifiers against the genes of an expression
/// matrix: exact identifier first, then the normalized symbol.
pub struct GeneLookup<'a> {
    expr: &'a ExpressionMatrix,
    by_symbol: BTreeMap<String, u32>,
}

impl<'a> GeneLookup<'a> {
    pub fn new(expr: &'a ExpressionMatrix) -> Self {
        let mut by_symbol = BTreeMap::new();
        for (idx, gene) in expr.genes().iter().enumerate() {
            let sym = normalize_symbol(gene);
            if sym.is_empty() {
                continue;
            }
            if by_symbol.contains_key(&sym) {
                tracing::debug!(
                    symbol = %sym,
                    gene = %gene,
                    "normalized symbol already mapped; keeping first gene"
                );
                continue;
            }
            by_symbol.insert(sym, idx as u32);
        }
        Self { expr, by_symbol }
    }

    pub fn resolve(&self, gene: &str) -> Option<u32> {
        if let Some(idx) = self.expr.gene_index(gene) {
            return Some(idx as u32);
        }
        self.by_symbol.get(&normalize_symbol(gene)).copied()
    }
}

/// Maps one regulon onto gene indices. Returns the scorable regulon and the
/// distinct identifiers that were not found; fails with `EmptyRegulon` when
/// nothing maps.
pub fn map_regulon(
    regulon: &Regulon,
    lookup: &GeneLookup<'_>,
) -> Result<(ScorableRegulon, Vec<String>), ScoringError> {
    let missing = missing_genes(regulon, lookup);
    let mut genes = Vec::with_capacity(regulon.genes.len());
    let mut seen = HashSet::with_capacity(regulon.genes.len());

    for idx in regulon.genes.iter().filter_map(|g| lookup.resolve(g)) {
        if seen.insert(idx) {
            genes.push(idx);
        }
    }

    if genes.is_empty() {
        return Err(empty_regulon(&regulon.name, missing.len()));
    }
    genes.sort_unstable();

    Ok((
        ScorableRegulon {
            name: regulon.name.clone(),
            genes,
        },
        missing,
    ))
}

/// Unresolved identifiers in first-appearance order, each listed once.
fn missing_genes(regulon: &Regulon, lookup: &GeneLookup<'_>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut missing = Vec::new();
    for gene in &regulon.genes {
        if lookup.resolve(gene).is_none() && seen.insert(gene.as_str()) {
            missing.push(gene.clone());
        }
    }
    missing
}

/// Applies gene mapping and the size policy to every regulon. Excluded
/// regulons are kept in the audit list with a reason and a diagnostic.
pub fn prepare_regulons(
    expr: &ExpressionMatrix,
    regulons: &[Regulon],
    params: &AucParams,
) -> PreparedRegulons {
    let lookup = GeneLookup::new(expr);
    let mut scorable = Vec::with_capacity(regulons.len());
    let mut audits = Vec::with_capacity(regulons.len());
    let mut diagnostics = Vec::new();
    let mut names = BTreeSet::new();

    for regulon in regulons {
        let size_defined = regulon.genes.iter().collect::<HashSet<_>>().len();

        if !names.insert(regulon.name.clone()) {
            tracing::warn!(regulon = %regulon.name, "duplicate regulon name; keeping first");
            diagnostics.push(Diagnostic::note(
                Stage::Regulons,
                &regulon.name,
                "duplicate_name",
                "duplicate regulon name; later definition ignored".to_string(),
            ));
            audits.push(RegulonAudit {
                regulon: regulon.name.clone(),
                size_defined,
                size_scored: 0,
                missing_genes: Vec::new(),
                excluded: Some(ExclusionReason::DuplicateName),
            });
            continue;
        }

        match map_regulon(regulon, &lookup) {
            Ok((mapped, missing)) => {
                if !missing.is_empty() {
                    tracing::debug!(
                        regulon = %regulon.name,
                        dropped = missing.len(),
                        "regulon genes absent from expression matrix"
                    );
                    diagnostics.push(Diagnostic::note(
                        Stage::Regulons,
                        &regulon.name,
                        "genes_dropped",
                        format!("{} genes absent from expression matrix", missing.len()),
                    ));
                }
                let size_scored = mapped.genes.len();
                let excluded = if size_scored < params.min_regulon_size {
                    tracing::warn!(
                        regulon = %regulon.name,
                        size = size_scored,
                        min = params.min_regulon_size,
                        "regulon below minimum size; excluded from scoring"
                    );
                    diagnostics.push(Diagnostic::note(
                        Stage::Regulons,
                        &regulon.name,
                        "below_min_size",
                        format!(
                            "{} scorable genes, minimum is {}",
                            size_scored, params.min_regulon_size
                        ),
                    ));
                    Some(ExclusionReason::BelowMinSize)
                } else {
                    scorable.push(mapped);
                    None
                };
                audits.push(RegulonAudit {
                    regulon: regulon.name.clone(),
                    size_defined,
                    size_scored,
                    missing_genes: missing,
                    excluded,
                });
            }
            Err(err) => {
                tracing::warn!(regulon = %regulon.name, "{err}");
                diagnostics.push(Diagnostic::from_error(Stage::Regulons, &regulon.name, &err));
                audits.push(RegulonAudit {
                    regulon: regulon.name.clone(),
                    size_defined,
                    size_scored: 0,
                    missing_genes: missing_genes(regulon, &lookup),
                    excluded: Some(ExclusionReason::Empty),
                });
            }
        }
    }

    PreparedRegulons {
        scorable,
        audits,
        diagnostics,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/regulons/mapping.rs"]
mod tests;

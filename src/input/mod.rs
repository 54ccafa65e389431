use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod barcodes;
pub mod features;
pub mod meta;
pub mod mtx;
pub mod overrides;
pub mod reader;

use barcodes::parse_barcodes;
use features::{Feature, parse_features};
use meta::{CellMeta, load_meta};
use mtx::{find_matrix_path, read_mtx_columns};

use crate::error::ScoringError;
use crate::model::expression::ExpressionMatrix;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Maps raw feature rows onto deduplicated gene ids.
#[derive(Debug, Clone)]
pub struct GeneIndex {
    pub gene_id_by_feature: Vec<Option<usize>>,
    pub genes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InputBundle {
    pub mtx_path: PathBuf,
    pub features_path: PathBuf,
    pub barcodes_path: PathBuf,
    pub n_features_raw: usize,
    pub gene_index: GeneIndex,
    pub barcodes: Vec<String>,
    pub meta: Option<CellMeta>,
}

impl InputBundle {
    pub fn n_cells(&self) -> usize {
        self.barcodes.len()
    }

    pub fn n_genes(&self) -> usize {
        self.gene_index.genes.len()
    }
}

/// Discovers and parses the side files of a 10x matrix directory. The matrix
/// itself is read by [`load_expression`].
pub fn load_input(input_dir: &Path, meta_path: Option<&Path>) -> Result<InputBundle, InputError> {
    let mtx_path = find_matrix_path(input_dir)?;
    let features_path = find_first(
        input_dir,
        &["features.tsv", "features.tsv.gz", "genes.tsv", "genes.tsv.gz"],
        "missing features.tsv(.gz) or genes.tsv(.gz)",
    )?;
    let barcodes_path = find_first(
        input_dir,
        &["barcodes.tsv", "barcodes.tsv.gz"],
        "missing barcodes.tsv or barcodes.tsv.gz",
    )?;

    tracing::info!(
        mtx = %mtx_path.display(),
        features = %features_path.display(),
        barcodes = %barcodes_path.display(),
        "discovered input files"
    );

    let features = parse_features(&features_path)?;
    let gene_index = build_gene_index(&features);
    let barcodes = parse_barcodes(&barcodes_path)?;
    let meta = match meta_path {
        Some(path) => Some(load_meta(path, &barcodes)?),
        None => None,
    };

    Ok(InputBundle {
        mtx_path,
        features_path,
        barcodes_path,
        n_features_raw: features.len(),
        gene_index,
        barcodes,
        meta,
    })
}

pub fn load_expression(bundle: &InputBundle) -> Result<ExpressionMatrix, InputError> {
    let cols = read_mtx_columns(
        &bundle.mtx_path,
        bundle.n_features_raw,
        bundle.n_cells(),
        &bundle.gene_index,
    )?;
    let matrix =
        ExpressionMatrix::from_columns(bundle.gene_index.genes.clone(), bundle.barcodes.clone(), cols)?;
    tracing::info!(
        genes = matrix.n_genes(),
        cells = matrix.n_cells(),
        nnz = matrix.nnz(),
        "expression matrix loaded"
    );
    Ok(matrix)
}

/// Keeps gene-expression features only. Features whose normalized symbol was
/// already seen share the first feature's gene id.
pub fn build_gene_index(features: &[Feature]) -> GeneIndex {
    let mut genes: Vec<String> = Vec::new();
    let mut by_symbol: HashMap<&str, usize> = HashMap::new();
    let mut gene_id_by_feature = Vec::with_capacity(features.len());
    let mut skipped_types = 0usize;

    for (idx, feature) in features.iter().enumerate() {
        if feature.symbol_norm.is_empty() || !feature.is_gene_expression() {
            if !feature.is_gene_expression() {
                skipped_types += 1;
            }
            gene_id_by_feature.push(None);
            continue;
        }
        if let Some(&existing) = by_symbol.get(feature.symbol_norm.as_str()) {
            tracing::warn!(
                feature_index = idx,
                symbol = %feature.symbol_norm,
                "duplicate gene symbol; merging into existing gene"
            );
            gene_id_by_feature.push(Some(existing));
            continue;
        }
        let gene_id = genes.len();
        genes.push(feature.symbol.clone());
        by_symbol.insert(feature.symbol_norm.as_str(), gene_id);
        gene_id_by_feature.push(Some(gene_id));
    }

    if skipped_types > 0 {
        tracing::info!(skipped = skipped_types, "non gene-expression features ignored");
    }

    GeneIndex {
        gene_id_by_feature,
        genes,
    }
}

fn find_first(input_dir: &Path, names: &[&str], missing: &str) -> Result<PathBuf, InputError> {
    names
        .iter()
        .map(|name| input_dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| InputError::MissingInput(missing.to_string()))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;

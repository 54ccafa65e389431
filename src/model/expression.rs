use std::collections::HashMap;

use crate::error::ScoringError;

/// Genes × cells expression values stored column-wise (one sparse column per
/// cell). Absent entries are zero.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    genes: Vec<String>,
    cells: Vec<String>,
    gene_lookup: HashMap<String, usize>,
    cols: Vec<Vec<(u32, f32)>>,
}

impl ExpressionMatrix {
    /// Builds a matrix from sparse columns of `(gene_index, value)` pairs.
    ///
    /// Rejects duplicated identifiers, out-of-range gene indices, repeated
    /// genes within a column and negative or non-finite values. Explicit zero
    /// entries are dropped and each column is sorted by gene index.
    pub fn from_columns(
        genes: Vec<String>,
        cells: Vec<String>,
        cols: Vec<Vec<(u32, f32)>>,
    ) -> Result<Self, ScoringError> {
        if cols.len() != cells.len() {
            return Err(ScoringError::InvalidInput(format!(
                "{} columns supplied for {} cells",
                cols.len(),
                cells.len()
            )));
        }
        let gene_lookup = unique_index(&genes, "gene")?;
        unique_index(&cells, "cell")?;

        let n_genes = genes.len();
        let mut clean = Vec::with_capacity(cols.len());
        for (cell, mut col) in cols.into_iter().enumerate() {
            for &(gene, value) in &col {
                if gene as usize >= n_genes {
                    return Err(ScoringError::InvalidInput(format!(
                        "gene index {} out of range in cell {}",
                        gene, cells[cell]
                    )));
                }
                if !value.is_finite() || value < 0.0 {
                    return Err(ScoringError::InvalidInput(format!(
                        "expression value {} for gene {} in cell {} is negative or non-finite",
                        value, genes[gene as usize], cells[cell]
                    )));
                }
            }
            col.retain(|&(_, v)| v != 0.0);
            col.sort_by_key(|&(g, _)| g);
            if col.windows(2).any(|w| w[0].0 == w[1].0) {
                return Err(ScoringError::InvalidInput(format!(
                    "repeated gene entry in cell {}",
                    cells[cell]
                )));
            }
            clean.push(col);
        }

        Ok(Self {
            genes,
            cells,
            gene_lookup,
            cols: clean,
        })
    }

    /// Builds a matrix from dense rows (`rows[gene][cell]`).
    pub fn from_dense(
        genes: Vec<String>,
        cells: Vec<String>,
        rows: &[Vec<f32>],
    ) -> Result<Self, ScoringError> {
        if rows.len() != genes.len() {
            return Err(ScoringError::InvalidInput(format!(
                "{} rows supplied for {} genes",
                rows.len(),
                genes.len()
            )));
        }
        let mut cols = vec![Vec::new(); cells.len()];
        for (g, row) in rows.iter().enumerate() {
            if row.len() != cells.len() {
                return Err(ScoringError::InvalidInput(format!(
                    "row for gene {} has {} values, expected {}",
                    genes[g],
                    row.len(),
                    cells.len()
                )));
            }
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    cols[c].push((g as u32, v));
                }
            }
        }
        Self::from_columns(genes, cells, cols)
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.gene_lookup.get(gene).copied()
    }

    /// Non-zero entries of one cell, sorted by gene index.
    pub fn column(&self, cell: usize) -> &[(u32, f32)] {
        &self.cols[cell]
    }

    pub fn value(&self, gene: usize, cell: usize) -> f32 {
        let col = &self.cols[cell];
        match col.binary_search_by_key(&(gene as u32), |&(g, _)| g) {
            Ok(pos) => col[pos].1,
            Err(_) => 0.0,
        }
    }

    pub fn nnz(&self) -> usize {
        self.cols.iter().map(|c| c.len()).sum()
    }
}

fn unique_index(ids: &[String], what: &str) -> Result<HashMap<String, usize>, ScoringError> {
    let mut map = HashMap::with_capacity(ids.len());
    for (idx, id) in ids.iter().enumerate() {
        if map.insert(id.clone(), idx).is_some() {
            return Err(ScoringError::InvalidInput(format!(
                "duplicate {what} identifier: {id}"
            )));
        }
    }
    Ok(map)
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/expression.rs"]
mod tests;

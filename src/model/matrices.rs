use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::thresholds::ThresholdSource;

/// Per-cell gene ranks. `ranks[cell][gene]` is the 1-based descending
/// expression rank of `gene` in `cell`; `None` marks a cell whose ranking was
/// not computed (cancelled run).
#[derive(Debug, Clone, PartialEq)]
pub struct RankMatrix {
    pub genes: Vec<String>,
    pub cells: Vec<String>,
    pub ranks: Vec<Option<Vec<u32>>>,
}

impl RankMatrix {
    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_ranks(&self, cell: usize) -> Option<&[u32]> {
        self.ranks[cell].as_deref()
    }

    pub fn rank(&self, gene: usize, cell: usize) -> Option<u32> {
        self.ranks[cell].as_ref().map(|r| r[gene])
    }

    pub fn n_completed(&self) -> usize {
        self.ranks.iter().filter(|r| r.is_some()).count()
    }

    /// Gene indices of one cell ordered by rank.
    pub fn genes_in_rank_order(&self, cell: usize) -> Option<Vec<u32>> {
        let ranks = self.ranks[cell].as_ref()?;
        let mut order = vec![0u32; ranks.len()];
        for (gene, &rank) in ranks.iter().enumerate() {
            order[rank as usize - 1] = gene as u32;
        }
        Some(order)
    }
}

/// Identifier → position for the two axes of a regulons × cells matrix.
/// The first occurrence of a repeated identifier wins.
#[derive(Debug, Clone, Default, PartialEq)]
struct AxisIndex {
    regulons: HashMap<String, usize>,
    cells: HashMap<String, usize>,
}

impl AxisIndex {
    fn new(regulons: &[String], cells: &[String]) -> Self {
        Self {
            regulons: position_map(regulons),
            cells: position_map(cells),
        }
    }
}

fn position_map(ids: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(ids.len());
    for (idx, id) in ids.iter().enumerate() {
        map.entry(id.clone()).or_insert(idx);
    }
    map
}

/// Regulons × cells recovery AUC. `None` marks an entry that was not computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AucMatrix {
    pub regulons: Vec<String>,
    pub cells: Vec<String>,
    pub values: Vec<Vec<Option<f32>>>,
    #[serde(skip)]
    index: AxisIndex,
}

impl AucMatrix {
    pub fn new(regulons: Vec<String>, cells: Vec<String>, values: Vec<Vec<Option<f32>>>) -> Self {
        let index = AxisIndex::new(&regulons, &cells);
        Self {
            regulons,
            cells,
            values,
            index,
        }
    }

    pub fn n_regulons(&self) -> usize {
        self.regulons.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn regulon_index(&self, regulon: &str) -> Option<usize> {
        self.index.regulons.get(regulon).copied()
    }

    pub fn cell_index(&self, cell: &str) -> Option<usize> {
        self.index.cells.get(cell).copied()
    }

    pub fn get(&self, regulon: &str, cell: &str) -> Option<f32> {
        let r = self.regulon_index(regulon)?;
        let c = self.cell_index(cell)?;
        self.values[r][c]
    }

    pub fn row(&self, regulon: &str) -> Option<&[Option<f32>]> {
        self.regulon_index(regulon).map(|r| self.values[r].as_slice())
    }

    /// Computed values of one regulon, skipping missing entries.
    pub fn computed_values(&self, row: usize) -> Vec<f32> {
        self.values[row].iter().filter_map(|v| *v).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AppliedThreshold {
    pub value: f32,
    pub source: ThresholdSource,
}

/// Regulons × cells on/off calls derived from an [`AucMatrix`] and one
/// threshold per regulon. `None` marks a cell without a computed AUC or a
/// regulon without any threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryMatrix {
    pub regulons: Vec<String>,
    pub cells: Vec<String>,
    pub values: Vec<Vec<Option<u8>>>,
    pub applied: BTreeMap<String, AppliedThreshold>,
    #[serde(skip)]
    index: AxisIndex,
}

impl BinaryMatrix {
    pub fn new(
        regulons: Vec<String>,
        cells: Vec<String>,
        values: Vec<Vec<Option<u8>>>,
        applied: BTreeMap<String, AppliedThreshold>,
    ) -> Self {
        let index = AxisIndex::new(&regulons, &cells);
        Self {
            regulons,
            cells,
            values,
            applied,
            index,
        }
    }

    pub fn regulon_index(&self, regulon: &str) -> Option<usize> {
        self.index.regulons.get(regulon).copied()
    }

    pub fn cell_index(&self, cell: &str) -> Option<usize> {
        self.index.cells.get(cell).copied()
    }

    pub fn get(&self, regulon: &str, cell: &str) -> Option<u8> {
        let r = self.regulon_index(regulon)?;
        let c = self.cell_index(cell)?;
        self.values[r][c]
    }

    /// Fraction of cells called active among cells with a call.
    pub fn active_fraction(&self, regulon: &str) -> Option<f32> {
        let r = self.regulon_index(regulon)?;
        let mut on = 0usize;
        let mut called = 0usize;
        for v in self.values[r].iter().flatten() {
            called += 1;
            if *v == 1 {
                on += 1;
            }
        }
        if called == 0 {
            None
        } else {
            Some(on as f32 / called as f32)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/matrices.rs"]
mod tests;

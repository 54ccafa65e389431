use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::diagnostics::Diagnostic;

/// Cell identifier → category label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellAnnotation {
    labels: BTreeMap<String, String>,
}

impl CellAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, C, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        let labels = pairs
            .into_iter()
            .map(|(c, l)| (c.into(), l.into()))
            .collect();
        Self { labels }
    }

    pub fn insert(&mut self, cell: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(cell.into(), label.into());
    }

    pub fn label(&self, cell: &str) -> Option<&str> {
        self.labels.get(cell).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct labels in sorted order.
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self.labels.values().cloned().collect();
        cats.sort();
        cats.dedup();
        cats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RssRow {
    pub regulon: String,
    pub category: String,
    pub n_cells: usize,
    /// `None` when the score is undefined (category too small, or no
    /// activity for the regulon among annotated cells).
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RssTable {
    pub rows: Vec<RssRow>,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
    /// regulon → category → row position.
    #[serde(skip)]
    index: HashMap<String, HashMap<String, usize>>,
}

impl RssTable {
    pub fn new(rows: Vec<RssRow>, diagnostics: Vec<Diagnostic>, cancelled: bool) -> Self {
        let mut index: HashMap<String, HashMap<String, usize>> = HashMap::new();
        for (pos, row) in rows.iter().enumerate() {
            index
                .entry(row.regulon.clone())
                .or_default()
                .entry(row.category.clone())
                .or_insert(pos);
        }
        Self {
            rows,
            diagnostics,
            cancelled,
            index,
        }
    }

    pub fn get(&self, regulon: &str, category: &str) -> Option<f32> {
        let pos = *self.index.get(regulon)?.get(category)?;
        self.rows[pos].score
    }

    /// Regulons with a defined score for `category`, most specific first.
    /// Equal scores keep regulon name order.
    pub fn top_for_category(&self, category: &str, n: usize) -> Vec<(&str, f32)> {
        let mut hits: Vec<(&str, f32)> = self
            .rows
            .iter()
            .filter(|r| r.category == category)
            .filter_map(|r| r.score.map(|s| (r.regulon.as_str(), s)))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        hits.truncate(n);
        hits
    }
}

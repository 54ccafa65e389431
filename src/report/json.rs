use serde::Serialize;

use crate::model::config::ScoringConfig;
use crate::model::diagnostics::Diagnostic;
use crate::report::RegulonStats;

#[derive(Debug, Clone, Serialize)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub n_cells: usize,
    pub n_genes: usize,
    pub n_regulons_defined: usize,
    pub n_regulons_scored: usize,
    pub annotation_column: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub tool: ToolMeta,
    pub input: InputSummary,
    pub config: ScoringConfig,
    pub cutoff_rank: usize,
    pub cancelled: bool,
    pub n_bimodal: usize,
    pub n_overrides: usize,
    pub regulons: Vec<RegulonStats>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn render_summary_json(data: &SummaryData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

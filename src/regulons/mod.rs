pub mod loader;
pub mod mapping;

use serde::Serialize;

use crate::error::ScoringError;
use crate::model::diagnostics::Diagnostic;

/// A transcription factor and its target genes, as delivered by the network
/// inference step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regulon {
    pub name: String,
    pub genes: Vec<String>,
}

impl Regulon {
    pub fn new<I, S>(name: impl Into<String>, genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            genes: genes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Regulon mapped onto the gene index of an expression matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorableRegulon {
    pub name: String,
    pub genes: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    Empty,
    BelowMinSize,
    DuplicateName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegulonAudit {
    pub regulon: String,
    pub size_defined: usize,
    pub size_scored: usize,
    pub missing_genes: Vec<String>,
    pub excluded: Option<ExclusionReason>,
}

#[derive(Debug, Clone)]
pub struct PreparedRegulons {
    pub scorable: Vec<ScorableRegulon>,
    pub audits: Vec<RegulonAudit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PreparedRegulons {
    pub fn excluded(&self) -> impl Iterator<Item = &RegulonAudit> {
        self.audits.iter().filter(|a| a.excluded.is_some())
    }
}

pub(crate) fn empty_regulon(name: &str, dropped: usize) -> ScoringError {
    ScoringError::EmptyRegulon {
        regulon: name.to_string(),
        dropped,
    }
}

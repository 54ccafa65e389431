use serde::Serialize;

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Regulons,
    Rank,
    Auc,
    Thresholds,
    Binarize,
    Rss,
}

/// Per-entity problem recorded while the rest of a batch proceeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub entity: String,
    pub kind: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(stage: Stage, entity: &str, err: &ScoringError) -> Self {
        Self {
            stage,
            entity: entity.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn note(stage: Stage, entity: &str, kind: &'static str, message: String) -> Self {
        Self {
            stage,
            entity: entity.to_string(),
            kind,
            message,
        }
    }
}

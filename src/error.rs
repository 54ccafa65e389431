use thiserror::Error;

/// Errors raised by the scoring core.
///
/// `InvalidInput` and `Configuration` are fatal and surface before any scoring
/// starts. `EmptyRegulon` and `InsufficientData` are local to one regulon; the
/// batch stages turn them into [`crate::model::diagnostics::Diagnostic`]
/// records and keep going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("regulon {regulon} has no scorable genes ({dropped} genes absent from the matrix)")]
    EmptyRegulon { regulon: String, dropped: usize },
    #[error("insufficient data for regulon {regulon}: {reason}")]
    InsufficientData { regulon: String, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("run cancelled")]
    Cancelled,
}

impl ScoringError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::InvalidInput(_) => "invalid_input",
            ScoringError::EmptyRegulon { .. } => "empty_regulon",
            ScoringError::InsufficientData { .. } => "insufficient_data",
            ScoringError::Configuration(_) => "configuration",
            ScoringError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/error.rs"]
mod tests;

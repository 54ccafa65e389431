//! Regulon activity scoring for single-cell expression data.
//!
//! The core takes an [`ExpressionMatrix`] and a list of [`Regulon`]s and
//! produces, per cell, a recovery-curve AUC for every regulon, data-driven
//! on/off thresholds, a binary activity matrix and, given cell categories,
//! regulon specificity scores. Every stage is a pure function of its inputs
//! and runs its independent units (cells or regulons) on the rayon pool.

pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod regulons;
pub mod report;

pub use error::ScoringError;
pub use model::cancel::CancelToken;
pub use model::config::{
    AucParams, RankCutoff, RecoveryStatistic, RssParams, ScoringConfig, ThresholdParams,
};
pub use model::expression::ExpressionMatrix;
pub use model::matrices::{AucMatrix, BinaryMatrix, RankMatrix};
pub use model::rss::{CellAnnotation, RssTable};
pub use model::thresholds::{Confidence, RegulonThreshold, ThresholdSet, ThresholdSource};
pub use pipeline::{ScoringInput, ScoringOutput, run_scoring};
pub use regulons::Regulon;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::diagnostics::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Estimated,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Two well separated components were found.
    Bimodal,
    /// The distribution looks unimodal; the selected threshold is the
    /// degenerate fallback that switches every cell off.
    NotBimodal,
    /// Too few cells or zero variance; fallback threshold.
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    DensityCrossing,
    LowerTail,
    GlobalMeanSd,
    Fallback,
}

impl CandidateKind {
    pub fn label(self) -> &'static str {
        match self {
            CandidateKind::DensityCrossing => "density_crossing",
            CandidateKind::LowerTail => "lower_tail",
            CandidateKind::GlobalMeanSd => "global_mean_sd",
            CandidateKind::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdCandidate {
    pub kind: CandidateKind,
    pub value: f32,
}

/// Two-component Gaussian mixture; component 0 has the lower mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixtureFit {
    pub weights: [f64; 2],
    pub means: [f64; 2],
    pub sds: [f64; 2],
    pub iterations: usize,
    pub converged: bool,
    pub log_likelihood: f64,
}

impl MixtureFit {
    /// Ashman's D between the two components.
    pub fn separation(&self) -> f64 {
        let pooled = (self.sds[0] * self.sds[0] + self.sds[1] * self.sds[1]).sqrt();
        if pooled == 0.0 {
            return f64::INFINITY;
        }
        std::f64::consts::SQRT_2 * (self.means[1] - self.means[0]).abs() / pooled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegulonThreshold {
    pub regulon: String,
    pub value: f32,
    pub selected: CandidateKind,
    pub source: ThresholdSource,
    pub confidence: Confidence,
    pub candidates: Vec<ThresholdCandidate>,
    pub fit: Option<MixtureFit>,
}

impl RegulonThreshold {
    pub fn candidate(&self, kind: CandidateKind) -> Option<f32> {
        self.candidates
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSet {
    pub thresholds: BTreeMap<String, RegulonThreshold>,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
}

impl ThresholdSet {
    pub fn get(&self, regulon: &str) -> Option<&RegulonThreshold> {
        self.thresholds.get(regulon)
    }

    pub fn n_confident(&self) -> usize {
        self.thresholds
            .values()
            .filter(|t| t.confidence == Confidence::Bimodal)
            .count()
    }
}

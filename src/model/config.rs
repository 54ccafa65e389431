use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RankCutoff {
    /// Fraction of the ranked genes, rounded up.
    Fraction(f64),
    /// Absolute rank, capped to the number of genes.
    Absolute(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatistic {
    /// Area under the recovery curve up to the cutoff, divided by the largest
    /// area a regulon of that size can reach.
    Area,
    /// Number of regulon genes inside the cutoff divided by `min(|regulon|, R)`.
    /// Gives 0.5 for a two-gene regulon with one hit at rank 2 and `R = 2`,
    /// where `Area` gives 1/3.
    HitFraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AucParams {
    pub cutoff: RankCutoff,
    pub min_regulon_size: usize,
    pub statistic: RecoveryStatistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub min_cells: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub min_component_weight: f64,
    pub min_separation: f64,
    pub lower_tail_k: f64,
    pub epsilon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssParams {
    pub min_category_cells: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub auc: AucParams,
    pub thresholds: ThresholdParams,
    pub rss: RssParams,
}

impl AucParams {
    pub fn default_v1() -> Self {
        Self {
            cutoff: RankCutoff::Fraction(0.05),
            min_regulon_size: 10,
            statistic: RecoveryStatistic::Area,
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        match self.cutoff {
            RankCutoff::Fraction(f) => {
                if !f.is_finite() || f <= 0.0 || f > 1.0 {
                    return Err(ScoringError::Configuration(format!(
                        "rank cutoff fraction must be in (0, 1], got {f}"
                    )));
                }
            }
            RankCutoff::Absolute(r) => {
                if r == 0 {
                    return Err(ScoringError::Configuration(
                        "absolute rank cutoff must be positive".to_string(),
                    ));
                }
            }
        }
        if self.min_regulon_size == 0 {
            return Err(ScoringError::Configuration(
                "minimum regulon size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective cutoff rank `R` for a matrix with `n_genes` ranked genes.
    pub fn cutoff_rank(&self, n_genes: usize) -> Result<usize, ScoringError> {
        self.validate()?;
        if n_genes == 0 {
            return Err(ScoringError::InvalidInput(
                "expression matrix has no genes".to_string(),
            ));
        }
        let r = match self.cutoff {
            RankCutoff::Fraction(f) => ceil_fraction(f, n_genes),
            RankCutoff::Absolute(r) => r,
        };
        Ok(r.clamp(1, n_genes))
    }
}

/// `ceil(f * n)` where a product within rounding error of an integer counts
/// as that integer (0.07 * 100 is 7, not 8).
fn ceil_fraction(f: f64, n: usize) -> usize {
    let product = f * n as f64;
    let nearest = product.round();
    if (product - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        nearest as usize
    } else {
        product.ceil() as usize
    }
}

impl ThresholdParams {
    pub fn default_v1() -> Self {
        Self {
            min_cells: 2,
            max_iter: 200,
            tolerance: 1e-6,
            min_component_weight: 0.05,
            min_separation: 2.0,
            lower_tail_k: 3.0,
            epsilon: 1e-6,
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.min_cells < 2 {
            return Err(ScoringError::Configuration(
                "threshold fitting needs min_cells >= 2".to_string(),
            ));
        }
        if self.max_iter == 0 {
            return Err(ScoringError::Configuration(
                "max_iter must be positive".to_string(),
            ));
        }
        let positive = [
            ("tolerance", self.tolerance),
            ("epsilon", self.epsilon),
            ("min_separation", self.min_separation),
            ("lower_tail_k", self.lower_tail_k),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoringError::Configuration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(0.0..0.5).contains(&self.min_component_weight) {
            return Err(ScoringError::Configuration(format!(
                "min_component_weight must be in [0, 0.5), got {}",
                self.min_component_weight
            )));
        }
        Ok(())
    }
}

impl RssParams {
    pub fn default_v1() -> Self {
        Self {
            min_category_cells: 2,
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.min_category_cells == 0 {
            return Err(ScoringError::Configuration(
                "min_category_cells must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ScoringConfig {
    pub fn default_v1() -> Self {
        Self {
            auc: AucParams::default_v1(),
            thresholds: ThresholdParams::default_v1(),
            rss: RssParams::default_v1(),
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        self.auc.validate()?;
        self.thresholds.validate()?;
        self.rss.validate()
    }

    /// Parses and validates a JSON config. Omitted sections keep their
    /// defaults.
    pub fn from_json(text: &str) -> Result<Self, ScoringError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ScoringError::Configuration(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/config.rs"]
mod tests;

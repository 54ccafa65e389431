use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::ScoringError;
use crate::model::cancel::CancelToken;
use crate::model::config::ThresholdParams;
use crate::model::diagnostics::{Diagnostic, Stage};
use crate::model::matrices::AucMatrix;
use crate::model::thresholds::{
    CandidateKind, Confidence, MixtureFit, RegulonThreshold, ThresholdCandidate, ThresholdSet,
    ThresholdSource,
};

const KMEANS_MAX_ITER: usize = 100;

/// Estimates one binarization threshold per regulon from its AUC values
/// across cells. Regulons are processed in parallel; a regulon that cannot be
/// fitted gets the all-off fallback and a diagnostic.
pub fn run_stage3(
    auc: &AucMatrix,
    params: &ThresholdParams,
    cancel: &CancelToken,
) -> Result<ThresholdSet, ScoringError> {
    params.validate()?;

    let results: Vec<Option<(RegulonThreshold, Option<Diagnostic>)>> = (0..auc.n_regulons())
        .into_par_iter()
        .map(|row| {
            if cancel.is_cancelled() {
                return None;
            }
            let name = &auc.regulons[row];
            let values = auc.computed_values(row);
            Some(match estimate_threshold(name, &values, params) {
                Ok(t) => (t, None),
                Err(err) => {
                    tracing::warn!(regulon = %name, "{err}; using fallback threshold");
                    (
                        fallback_threshold(name, &values, params, Confidence::InsufficientData),
                        Some(Diagnostic::from_error(Stage::Thresholds, name, &err)),
                    )
                }
            })
        })
        .collect();

    let mut thresholds = BTreeMap::new();
    let mut diagnostics = Vec::new();
    let mut cancelled = false;
    for result in results {
        match result {
            Some((threshold, diagnostic)) => {
                if threshold.confidence == Confidence::NotBimodal {
                    diagnostics.push(Diagnostic::note(
                        Stage::Thresholds,
                        &threshold.regulon,
                        "not_bimodal",
                        "AUC distribution not confidently bimodal; all cells off".to_string(),
                    ));
                }
                diagnostics.extend(diagnostic);
                thresholds.insert(threshold.regulon.clone(), threshold);
            }
            None => cancelled = true,
        }
    }

    let set = ThresholdSet {
        thresholds,
        diagnostics,
        cancelled,
    };
    tracing::info!(
        regulons = set.thresholds.len(),
        bimodal = set.n_confident(),
        "thresholds estimated"
    );
    Ok(set)
}

/// Fits a two-component Gaussian mixture to `values` and derives threshold
/// candidates.
///
/// Initialization is deterministic: a 1-D k-means seeded at the minimum and
/// maximum, whose clusters give the starting weights, means and standard
/// deviations for EM. The selected threshold is the density crossing when
/// the fit converged, both components hold at least `min_component_weight`
/// of the cells and Ashman's D reaches `min_separation`; otherwise it is the
/// fallback `max + epsilon` and the result is flagged `NotBimodal`.
pub fn estimate_threshold(
    regulon: &str,
    values: &[f32],
    params: &ThresholdParams,
) -> Result<RegulonThreshold, ScoringError> {
    if values.len() < params.min_cells {
        return Err(ScoringError::InsufficientData {
            regulon: regulon.to_string(),
            reason: format!(
                "{} cells with a computed AUC, at least {} required",
                values.len(),
                params.min_cells
            ),
        });
    }
    let xs: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    let (mean, sd) = mean_sd(&xs);
    if sd <= f64::EPSILON * mean.abs().max(1.0) {
        return Err(ScoringError::InsufficientData {
            regulon: regulon.to_string(),
            reason: "AUC has zero variance across cells".to_string(),
        });
    }

    let fit = fit_mixture(&xs, params, sd);
    let max = max_value(values);
    let fallback = max + params.epsilon as f32;

    let crossing = density_crossing(&fit);
    let mut candidates = Vec::with_capacity(4);
    if let Some(x) = crossing {
        candidates.push(ThresholdCandidate {
            kind: CandidateKind::DensityCrossing,
            value: x as f32,
        });
    }
    candidates.push(ThresholdCandidate {
        kind: CandidateKind::LowerTail,
        value: (fit.means[0] + params.lower_tail_k * fit.sds[0]) as f32,
    });
    candidates.push(ThresholdCandidate {
        kind: CandidateKind::GlobalMeanSd,
        value: (mean + sd) as f32,
    });
    candidates.push(ThresholdCandidate {
        kind: CandidateKind::Fallback,
        value: fallback,
    });

    let bimodal = fit.converged
        && fit.weights[0].min(fit.weights[1]) >= params.min_component_weight
        && fit.separation() >= params.min_separation
        && crossing.is_some();

    let (value, selected, confidence) = match crossing {
        Some(x) if bimodal => (x as f32, CandidateKind::DensityCrossing, Confidence::Bimodal),
        _ => {
            tracing::debug!(
                regulon,
                converged = fit.converged,
                separation = fit.separation(),
                "AUC distribution not confidently bimodal"
            );
            (fallback, CandidateKind::Fallback, Confidence::NotBimodal)
        }
    };

    Ok(RegulonThreshold {
        regulon: regulon.to_string(),
        value,
        selected,
        source: ThresholdSource::Estimated,
        confidence,
        candidates,
        fit: Some(fit),
    })
}

fn fallback_threshold(
    regulon: &str,
    values: &[f32],
    params: &ThresholdParams,
    confidence: Confidence,
) -> RegulonThreshold {
    let value = if values.is_empty() {
        1.0 + params.epsilon as f32
    } else {
        max_value(values) + params.epsilon as f32
    };
    RegulonThreshold {
        regulon: regulon.to_string(),
        value,
        selected: CandidateKind::Fallback,
        source: ThresholdSource::Estimated,
        confidence,
        candidates: vec![ThresholdCandidate {
            kind: CandidateKind::Fallback,
            value,
        }],
        fit: None,
    }
}

fn fit_mixture(xs: &[f64], params: &ThresholdParams, global_sd: f64) -> MixtureFit {
    let sd_floor = (global_sd * 1e-3).max(1e-9);
    let labels = kmeans_two(xs);

    let mut weights = [0.0; 2];
    let mut means = [0.0; 2];
    let mut sds = [0.0; 2];
    for k in 0..2 {
        let members: Vec<f64> = xs
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l == k)
            .map(|(x, _)| *x)
            .collect();
        let (m, s) = mean_sd(&members);
        weights[k] = members.len() as f64 / xs.len() as f64;
        means[k] = m;
        sds[k] = s.max(sd_floor);
    }

    let n = xs.len() as f64;
    let mut resp = vec![[0.0f64; 2]; xs.len()];
    let mut log_likelihood = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    'em: while iterations < params.max_iter {
        iterations += 1;

        // E step
        let mut ll = 0.0;
        for (x, r) in xs.iter().zip(resp.iter_mut()) {
            let l0 = weights[0].ln() + log_normal(*x, means[0], sds[0]);
            let l1 = weights[1].ln() + log_normal(*x, means[1], sds[1]);
            let m = l0.max(l1);
            let total = m + ((l0 - m).exp() + (l1 - m).exp()).ln();
            r[0] = (l0 - total).exp();
            r[1] = (l1 - total).exp();
            ll += total;
        }

        // M step
        for k in 0..2 {
            let nk: f64 = resp.iter().map(|r| r[k]).sum();
            if nk <= f64::EPSILON {
                // Collapsed component; the fit cannot separate two populations.
                weights[k] = 0.0;
                log_likelihood = ll;
                break 'em;
            }
            let mu = xs.iter().zip(&resp).map(|(x, r)| r[k] * x).sum::<f64>() / nk;
            let var = xs
                .iter()
                .zip(&resp)
                .map(|(x, r)| r[k] * (x - mu) * (x - mu))
                .sum::<f64>()
                / nk;
            weights[k] = nk / n;
            means[k] = mu;
            sds[k] = var.sqrt().max(sd_floor);
        }

        let delta = (ll - log_likelihood).abs();
        log_likelihood = ll;
        if delta <= params.tolerance * (1.0 + ll.abs()) {
            converged = true;
            break;
        }
    }

    if means[0] > means[1] {
        weights.swap(0, 1);
        means.swap(0, 1);
        sds.swap(0, 1);
    }

    MixtureFit {
        weights,
        means,
        sds,
        iterations,
        converged,
        log_likelihood,
    }
}

/// Two-cluster Lloyd iterations seeded at the extremes. Label 0 is the lower
/// cluster; ties go to it.
fn kmeans_two(xs: &[f64]) -> Vec<usize> {
    let mut centers = [
        xs.iter().copied().fold(f64::INFINITY, f64::min),
        xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    ];
    let mut labels = vec![0usize; xs.len()];
    for _ in 0..KMEANS_MAX_ITER {
        let mut changed = false;
        for (x, label) in xs.iter().zip(labels.iter_mut()) {
            let next = if (x - centers[1]).abs() < (x - centers[0]).abs() {
                1
            } else {
                0
            };
            if next != *label {
                *label = next;
                changed = true;
            }
        }
        for (k, center) in centers.iter_mut().enumerate() {
            let (sum, count) = xs
                .iter()
                .zip(&labels)
                .filter(|(_, l)| **l == k)
                .fold((0.0, 0usize), |(s, c), (x, _)| (s + x, c + 1));
            if count > 0 {
                *center = sum / count as f64;
            }
        }
        if !changed {
            break;
        }
    }
    labels
}

/// Point between the two means where the weighted component densities are
/// equal, if one exists.
pub fn density_crossing(fit: &MixtureFit) -> Option<f64> {
    let [w0, w1] = fit.weights;
    let [m0, m1] = fit.means;
    let [s0, s1] = fit.sds;
    if w0 <= 0.0 || w1 <= 0.0 || m1 <= m0 {
        return None;
    }
    let v0 = s0 * s0;
    let v1 = s1 * s1;
    let a = 1.0 / (2.0 * v1) - 1.0 / (2.0 * v0);
    let b = m0 / v0 - m1 / v1;
    let c = m1 * m1 / (2.0 * v1) - m0 * m0 / (2.0 * v0) + (w0 / s0).ln() - (w1 / s1).ln();

    let roots: Vec<f64> = if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }
        vec![-c / b]
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        // q-form keeps the root near the means accurate when `a` is tiny.
        let q = -0.5 * (b + b.signum() * disc.sqrt());
        if q == 0.0 {
            vec![0.0]
        } else {
            vec![q / a, c / q]
        }
    };

    let mid = 0.5 * (m0 + m1);
    roots
        .into_iter()
        .filter(|x| x.is_finite() && *x >= m0 && *x <= m1)
        .min_by(|a, b| (a - mid).abs().total_cmp(&(b - mid).abs()))
}

fn log_normal(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    -0.5 * z * z - sd.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
}

fn mean_sd(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn max_value(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_thresholds.rs"]
mod tests;

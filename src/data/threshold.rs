//! Cross-validated threshold estimation.
//!
//! The ratio of a cell is modelled as a straight line in the experimental
//! value, `ratio ≈ slope · experimental + intercept`. The out-of-sample RMSE of
//! that line, averaged over k folds, is the typical deviation a healthy cell
//! shows; scaled by the user's multiplier it becomes the half-width of the
//! acceptance band around 1.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::model::SampleSet;
use crate::config::RunParams;
use crate::error::{PipelineError, Result};

/// Half-width of the acceptance band around a ratio of 1.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(pub f64);

impl Threshold {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Ordinary least-squares line `y = slope · x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Closed-form fit over paired samples.
    ///
    /// When every `x` is the same the slope is 0 and the line is the mean of `y`.
    pub fn fit(x: &[f64], y: &[f64]) -> Self {
        let n = x.len() as f64;
        if x.is_empty() {
            return LinearFit {
                slope: 0.0,
                intercept: 0.0,
            };
        }
        let mean_x = x.iter().sum::<f64>() / n;
        let mean_y = y.iter().sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (&xi, &yi) in x.iter().zip(y) {
            let dx = xi - mean_x;
            sxx += dx * dx;
            sxy += dx * (yi - mean_y);
        }

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        LinearFit {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Root-mean-squared residual over the given samples.
    pub fn rmse(&self, x: &[f64], y: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let sse: f64 = x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| {
                let r = yi - self.predict(xi);
                r * r
            })
            .sum();
        (sse / x.len() as f64).sqrt()
    }
}

/// Split `0..n` into `folds` shuffled, disjoint groups.
///
/// The first `n % folds` groups hold one extra index, so sizes differ by at
/// most one.
pub fn k_fold_indices(n: usize, folds: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if folds < 2 {
        return Err(PipelineError::InvalidParameter(format!(
            "folds must be at least 2, got {folds}"
        )));
    }
    if n < folds {
        return Err(PipelineError::InsufficientData { samples: n, folds });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let base = n / folds;
    let extra = n % folds;
    let mut groups = Vec::with_capacity(folds);
    let mut start = 0;
    for i in 0..folds {
        let size = base + usize::from(i < extra);
        groups.push(indices[start..start + size].to_vec());
        start += size;
    }
    Ok(groups)
}

/// Per-fold RMSE of the linear model, each fold held out in turn.
pub fn cross_validated_rmse(samples: &SampleSet, folds: usize, seed: u64) -> Result<Vec<f64>> {
    let groups = k_fold_indices(samples.len(), folds, seed)?;

    let mut in_test = vec![false; samples.len()];
    let mut scores = Vec::with_capacity(folds);

    for test in &groups {
        in_test.iter_mut().for_each(|flag| *flag = false);
        for &i in test {
            in_test[i] = true;
        }

        let (mut train_x, mut train_y) = (Vec::new(), Vec::new());
        for i in (0..samples.len()).filter(|&i| !in_test[i]) {
            train_x.push(samples.x[i]);
            train_y.push(samples.y[i]);
        }
        let test_x: Vec<f64> = test.iter().map(|&i| samples.x[i]).collect();
        let test_y: Vec<f64> = test.iter().map(|&i| samples.y[i]).collect();

        let model = LinearFit::fit(&train_x, &train_y);
        scores.push(model.rmse(&test_x, &test_y));
    }

    Ok(scores)
}

/// Average cross-validated RMSE scaled by `params.multiplier`.
///
/// A zero multiplier always gives a zero threshold. If the residuals are too
/// large for `f64` the RMSE saturates at `+inf`, so the threshold is never `NaN`.
pub fn estimate_threshold(samples: &SampleSet, params: &RunParams) -> Result<Threshold> {
    params.validate()?;

    let scores = cross_validated_rmse(samples, params.folds, params.seed)?;
    let mut avg_rmse = scores.iter().sum::<f64>() / scores.len() as f64;
    log::debug!("Per-fold RMSE {scores:?}, average {avg_rmse:.6}");

    if params.multiplier == 0.0 {
        return Ok(Threshold(0.0));
    }
    if !avg_rmse.is_finite() {
        log::warn!("Cross-validated RMSE overflowed ({avg_rmse}); using an unbounded threshold");
        avg_rmse = f64::INFINITY;
    }
    Ok(Threshold(avg_rmse * params.multiplier))
}

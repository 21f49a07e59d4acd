//! Classical seasonal decomposition
//!
//! Splits a series into trend, seasonal and residual components:
//!
//! - the trend is a centred moving average over one period (a `2 x period`
//!   average for even periods), undefined (NaN) within half a period of
//!   either edge;
//! - the seasonal component is the per-phase average of the detrended series,
//!   normalised so the indices average to 1 (multiplicative) or 0 (additive),
//!   tiled from index 0;
//! - the residual is whatever remains.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// How the components combine into the observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecompositionModel {
    /// `y = trend + seasonal + residual`
    Additive,
    /// `y = trend * seasonal * residual`
    Multiplicative,
}

/// Decomposed series, aligned index-for-index with the input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub period: usize,
    pub model: DecompositionModel,
}

impl Decomposition {
    /// Recombine the components at `index`
    ///
    /// NaN at the edges where the trend is undefined.
    pub fn reconstruct(&self, index: usize) -> f64 {
        let (t, s, r) = (self.trend[index], self.seasonal[index], self.residual[index]);
        match self.model {
            DecompositionModel::Additive => t + s + r,
            DecompositionModel::Multiplicative => t * s * r,
        }
    }

    /// The `period` seasonal indices, starting at phase 0
    pub fn seasonal_indices(&self) -> &[f64] {
        &self.seasonal[..self.period.min(self.seasonal.len())]
    }
}

/// Decompose `values` with a fixed seasonal `period`
///
/// Requires at least two complete cycles (`2 * period` observations) and no
/// missing values; the multiplicative model also requires strictly positive
/// values.
pub fn seasonal_decompose(
    values: &[f64],
    period: usize,
    model: DecompositionModel,
) -> Result<Decomposition> {
    if period < 2 {
        return Err(MathError::InvalidInput(format!(
            "Seasonal period must be at least 2, got {}",
            period
        )));
    }

    let n = values.len();
    if n < 2 * period {
        return Err(MathError::InsufficientData(format!(
            "Decomposition needs 2 complete cycles ({} observations), series has {}",
            2 * period,
            n
        )));
    }

    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Decomposition does not handle missing or infinite values".to_string(),
        ));
    }

    if model == DecompositionModel::Multiplicative && values.iter().any(|&v| v <= 0.0) {
        return Err(MathError::InvalidInput(
            "Multiplicative seasonality is not appropriate for zero and negative values"
                .to_string(),
        ));
    }

    let trend = centred_trend(values, period);

    let detrended: Vec<f64> = values
        .iter()
        .zip(trend.iter())
        .map(|(&y, &t)| match model {
            DecompositionModel::Additive => y - t,
            DecompositionModel::Multiplicative => y / t,
        })
        .collect();

    let indices = seasonal_indices(&detrended, period, model)?;
    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();

    let residual: Vec<f64> = values
        .iter()
        .zip(trend.iter())
        .zip(seasonal.iter())
        .map(|((&y, &t), &s)| match model {
            DecompositionModel::Additive => y - t - s,
            DecompositionModel::Multiplicative => y / (t * s),
        })
        .collect();

    Ok(Decomposition {
        trend,
        seasonal,
        residual,
        period,
        model,
    })
}

/// Centred moving average with NaN edges
fn centred_trend(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;

    // Even periods use period + 1 taps with half weight at both ends
    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] = 0.5 / period as f64;
        w[period] = 0.5 / period as f64;
        w
    } else {
        vec![1.0 / period as f64; period]
    };

    let mut trend = vec![f64::NAN; n];
    for (i, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        *slot = weights
            .iter()
            .zip(&values[i - half..])
            .map(|(w, v)| w * v)
            .sum();
    }

    trend
}

/// Per-phase averages of the detrended series, normalised
fn seasonal_indices(
    detrended: &[f64],
    period: usize,
    model: DecompositionModel,
) -> Result<Vec<f64>> {
    let mut indices = Vec::with_capacity(period);

    for phase in 0..period {
        let observed: Vec<f64> = detrended
            .iter()
            .skip(phase)
            .step_by(period)
            .copied()
            .filter(|v| !v.is_nan())
            .collect();

        if observed.is_empty() {
            return Err(MathError::CalculationError(format!(
                "No detrended observations for seasonal phase {}",
                phase
            )));
        }

        indices.push(observed.iter().sum::<f64>() / observed.len() as f64);
    }

    let mean = indices.iter().sum::<f64>() / period as f64;
    match model {
        DecompositionModel::Additive => indices.iter_mut().for_each(|s| *s -= mean),
        DecompositionModel::Multiplicative => {
            if mean == 0.0 || !mean.is_finite() {
                return Err(MathError::CalculationError(
                    "Seasonal indices cannot be normalised".to_string(),
                ));
            }
            indices.iter_mut().for_each(|s| *s /= mean);
        }
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn trend_with_weekly_cycle(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.5 * i as f64 + 5.0 * (2.0 * PI * i as f64 / 7.0).sin())
            .collect()
    }

    #[test]
    fn test_too_short_series_rejected() {
        let values = vec![10.0; 59];
        let err = seasonal_decompose(&values, 30, DecompositionModel::Multiplicative).unwrap_err();
        assert!(matches!(err, MathError::InsufficientData(_)));

        // Exactly two cycles is enough
        let values = vec![10.0; 60];
        assert!(seasonal_decompose(&values, 30, DecompositionModel::Multiplicative).is_ok());
    }

    #[test]
    fn test_non_positive_values_rejected_for_multiplicative() {
        let mut values = trend_with_weekly_cycle(30);
        values[4] = 0.0;
        let err = seasonal_decompose(&values, 7, DecompositionModel::Multiplicative).unwrap_err();
        assert!(matches!(err, MathError::InvalidInput(_)));
        assert!(seasonal_decompose(&values, 7, DecompositionModel::Additive).is_ok());
    }

    #[test]
    fn test_missing_values_rejected() {
        let mut values = trend_with_weekly_cycle(30);
        values[10] = f64::NAN;
        assert!(seasonal_decompose(&values, 7, DecompositionModel::Additive).is_err());
    }

    #[test]
    fn test_trend_edges_are_nan() {
        let values = trend_with_weekly_cycle(100);

        let odd = seasonal_decompose(&values, 7, DecompositionModel::Multiplicative).unwrap();
        assert!(odd.trend[..3].iter().all(|t| t.is_nan()));
        assert!(odd.trend[97..].iter().all(|t| t.is_nan()));
        assert!(odd.trend[3..97].iter().all(|t| t.is_finite()));

        let even = seasonal_decompose(&values, 30, DecompositionModel::Multiplicative).unwrap();
        assert!(even.trend[..15].iter().all(|t| t.is_nan()));
        assert!(even.trend[85..].iter().all(|t| t.is_nan()));
        assert!(even.trend[15..85].iter().all(|t| t.is_finite()));
    }

    #[test]
    fn test_multiplicative_reconstruction() {
        let values = trend_with_weekly_cycle(100);
        let d = seasonal_decompose(&values, 30, DecompositionModel::Multiplicative).unwrap();

        for i in 15..85 {
            assert_relative_eq!(d.reconstruct(i), values[i], max_relative = 1e-10);
        }
        assert!(d.reconstruct(0).is_nan());
    }

    #[test]
    fn test_linear_trend_recovered_under_weekly_cycle() {
        let values = trend_with_weekly_cycle(100);
        let d = seasonal_decompose(&values, 7, DecompositionModel::Multiplicative).unwrap();

        for i in 3..97 {
            assert_relative_eq!(d.trend[i], 100.0 + 0.5 * i as f64, epsilon = 1e-9);
        }

        // Seasonal component repeats every 7 samples and peaks at the sine crest
        for i in 0..93 {
            assert_relative_eq!(d.seasonal[i], d.seasonal[i + 7], epsilon = 1e-12);
        }
        let indices = d.seasonal_indices();
        let peak = (0..7)
            .max_by(|&a, &b| indices[a].partial_cmp(&indices[b]).unwrap())
            .unwrap();
        assert_eq!(peak, 2);
        assert_relative_eq!(indices.iter().sum::<f64>() / 7.0, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_additive_indices_sum_to_zero() {
        let values = trend_with_weekly_cycle(70);
        let d = seasonal_decompose(&values, 7, DecompositionModel::Additive).unwrap();

        assert_relative_eq!(d.seasonal_indices().iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        for i in 3..67 {
            assert_relative_eq!(d.reconstruct(i), values[i], epsilon = 1e-9);
        }
    }
}

//! Metrics for evaluating forecast performance

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::models::ForecastResult;
use std::fmt;

/// Mean absolute error of a forecast against the actual values
///
/// The forecast must cover exactly the dates of `actual`, in order.
pub fn mean_absolute_error(forecast: &ForecastResult, actual: &DailySeries) -> Result<f64> {
    if forecast.horizons() != actual.len() {
        return Err(ForecastError::AlignmentError(format!(
            "Forecast has {} values but the actual series has {}",
            forecast.horizons(),
            actual.len()
        )));
    }

    if let Some((f, a)) = forecast
        .dates()
        .iter()
        .zip(actual.dates())
        .find(|(f, a)| f != a)
    {
        return Err(ForecastError::AlignmentError(format!(
            "Forecast date {} does not match actual date {}",
            f, a
        )));
    }

    if actual.is_empty() {
        return Err(ForecastError::InsufficientData(
            "Cannot compute MAE over an empty horizon".to_string(),
        ));
    }

    let total: f64 = forecast
        .values()
        .iter()
        .zip(actual.values())
        .map(|(f, a)| (f - a).abs())
        .sum();

    Ok(total / actual.len() as f64)
}

/// Elementwise arithmetic mean of forecasts covering the same dates
pub fn ensemble_mean(forecasts: &[&ForecastResult]) -> Result<ForecastResult> {
    let (first, rest) = forecasts.split_first().ok_or_else(|| {
        ForecastError::InvalidParameter("Ensemble needs at least one forecast".to_string())
    })?;

    for other in rest {
        if other.dates() != first.dates() {
            return Err(ForecastError::AlignmentError(format!(
                "Ensemble members cover different dates ({} vs {} values)",
                first.horizons(),
                other.horizons()
            )));
        }
    }

    let count = forecasts.len() as f64;
    let values = (0..first.horizons())
        .map(|i| forecasts.iter().map(|f| f.values()[i]).sum::<f64>() / count)
        .collect();

    ForecastResult::new(values, first.dates().to_vec())
}

/// A named scalar metric, persisted as one line of text
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReport {
    pub label: String,
    pub value: f64,
}

impl MetricReport {
    pub fn mae<S: Into<String>>(label: S, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} MAE: {}", self.label, self.value)
    }
}

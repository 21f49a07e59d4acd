//! Forecasting models for daily price series
//!
//! Models follow a two-step capability: a configured [`ForecastModel`] is
//! trained once on a series and yields a [`TrainedForecastModel`] that can
//! forecast any horizon past the end of its training data.

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use std::fmt::Debug;

pub mod arima;
pub mod prophet;

pub use arima::{ArimaModel, TrainedArimaModel};
pub use prophet::{ProphetModel, SeasonalityToggle, TrainedProphetModel};

/// Forecast values, one per calendar date
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Date of each value
    dates: Vec<NaiveDate>,
    /// Prediction intervals as (lower, upper), if the model provides them
    intervals: Option<Vec<(f64, f64)>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, dates: Vec<NaiveDate>) -> Result<Self> {
        if values.len() != dates.len() {
            return Err(ForecastError::AlignmentError(format!(
                "Values length ({}) doesn't match dates length ({})",
                values.len(),
                dates.len()
            )));
        }

        Ok(Self {
            values,
            dates,
            intervals: None,
        })
    }

    /// Create a new forecast result with prediction intervals
    pub fn new_with_intervals(
        values: Vec<f64>,
        dates: Vec<NaiveDate>,
        intervals: Vec<(f64, f64)>,
    ) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(ForecastError::AlignmentError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        let mut result = Self::new(values, dates)?;
        result.intervals = Some(intervals);
        Ok(result)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the date of every value
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Get the prediction intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Number of forecast periods
    pub fn horizons(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Select the values for `dates`, in that order
    ///
    /// Fails with an alignment error if any requested date is not covered.
    pub fn aligned_to(&self, dates: &[NaiveDate]) -> Result<Self> {
        let mut values = Vec::with_capacity(dates.len());
        let mut intervals = self.intervals.as_ref().map(|_| Vec::with_capacity(dates.len()));

        for date in dates {
            let idx = self
                .dates
                .binary_search(date)
                .map_err(|_| {
                    ForecastError::AlignmentError(format!("Forecast has no value for {}", date))
                })?;
            values.push(self.values[idx]);
            if let (Some(out), Some(src)) = (intervals.as_mut(), self.intervals.as_ref()) {
                out.push(src[idx]);
            }
        }

        match intervals {
            Some(intervals) => Self::new_with_intervals(values, dates.to_vec(), intervals),
            None => Self::new(values, dates.to_vec()),
        }
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Forecast `horizon` consecutive days after the end of the training data
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// In-sample values for the dates of `data`
    fn predict(&self, data: &DailySeries) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a daily series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a daily series
    fn train(&self, data: &DailySeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// The `horizon` days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon)
        .map(|offset| last + Duration::days(offset as i64))
        .collect()
}

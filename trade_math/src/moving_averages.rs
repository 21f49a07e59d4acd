//! Trailing moving averages
//!
//! Contains the streaming Simple Moving Average (SMA) and the
//! [`rolling_mean`] helper that applies it over a whole series.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) over a fixed trailing window
///
/// Missing observations (NaN) are tracked separately from the running sum so
/// a single gap only poisons the windows that actually contain it.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
    missing: usize,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            missing: 0,
        })
    }

    /// Push a new observation into the window
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if value.is_nan() {
            self.missing += 1;
        } else {
            self.sum += value;
        }

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                if old_value.is_nan() {
                    self.missing -= 1;
                } else {
                    self.sum -= old_value;
                }
            }
        }
    }

    /// Whether the window holds `period` observations
    pub fn is_ready(&self) -> bool {
        self.values.len() == self.period
    }

    /// Get the current SMA value
    ///
    /// Returns NaN when the full window contains a missing observation.
    pub fn value(&self) -> Result<f64> {
        if !self.is_ready() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        if self.missing > 0 {
            return Ok(f64::NAN);
        }

        Ok(self.sum / self.period as f64)
    }
}

/// Trailing moving average aligned index-for-index with `values`
///
/// The first `window - 1` entries are NaN because the window is not yet full.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut sma = SimpleMovingAverage::new(window)?;
    let mut result = Vec::with_capacity(values.len());

    for &value in values {
        sma.update(value);
        // value() only fails while the window is warming up
        result.push(sma.value().unwrap_or(f64::NAN));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma_calculation() {
        let mut sma = SimpleMovingAverage::new(3).unwrap();

        // Not enough data yet
        assert!(sma.value().is_err());

        sma.update(2.0);
        sma.update(4.0);

        // Still not enough data
        assert!(sma.value().is_err());

        sma.update(6.0);

        // Now we have enough data
        assert_eq!(sma.value().unwrap(), 4.0); // (2 + 4 + 6) / 3 = 4

        // The window slides, dropping the oldest value
        sma.update(8.0);
        assert_eq!(sma.value().unwrap(), 6.0); // (4 + 6 + 8) / 3 = 6
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(SimpleMovingAverage::new(0).is_err());
        assert!(rolling_mean(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_rolling_mean_warm_up_is_nan() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let ma = rolling_mean(&values, 3).unwrap();

        assert_eq!(ma.len(), values.len());
        assert!(ma[0].is_nan());
        assert!(ma[1].is_nan());
        for i in 2..values.len() {
            let expected = values[i - 2..=i].iter().sum::<f64>() / 3.0;
            assert_relative_eq!(ma[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rolling_mean_window_longer_than_series() {
        let ma = rolling_mean(&[1.0, 2.0], 7).unwrap();
        assert!(ma.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_missing_value_only_affects_its_windows() {
        let values = [1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0];
        let ma = rolling_mean(&values, 2).unwrap();

        assert!(ma[1].is_nan());
        assert!(ma[2].is_nan());
        assert_relative_eq!(ma[3], 3.5);
        assert_relative_eq!(ma[5], 5.5);
    }
}

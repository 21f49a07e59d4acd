//! ARIMA models for time series forecasting
//!
//! Autoregressive models on a `d`-times differenced series, estimated by
//! conditional least squares. Moving-average terms are not supported.

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::models::{future_dates, ForecastModel, ForecastResult, TrainedForecastModel};
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Whether the differenced series gets an intercept
    include_constant: bool,
    /// Coverage of the forecast intervals
    confidence: f64,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// Fitted AR coefficients, lag 1 first
    ar_coefficients: Vec<f64>,
    /// Intercept of the differenced series
    constant: f64,
    /// Residual variance
    sigma2: f64,
    /// Training values in levels
    historical_data: Vec<f64>,
    /// Training values differenced `d` times
    differenced: Vec<f64>,
    /// Last training date
    last_date: NaiveDate,
    /// Coverage of the forecast intervals
    confidence: f64,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if q > 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "ARIMA({},{},{}): moving-average terms are not supported",
                p, d, q
            )));
        }

        Ok(Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
            include_constant: false,
            confidence: 0.95,
        })
    }

    /// Fit an intercept on the differenced series (off by default)
    pub fn with_constant(mut self, include_constant: bool) -> Self {
        self.include_constant = include_constant;
        self
    }

    /// Set the coverage of the forecast intervals
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }
        self.confidence = confidence;
        Ok(self)
    }

    /// The (p, d, q) order
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    fn parameter_count(&self) -> usize {
        self.p + usize::from(self.include_constant)
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &DailySeries) -> Result<TrainedArimaModel> {
        let prices = data.values();
        let last_date = data.last_date().ok_or_else(|| {
            ForecastError::InsufficientData(format!("{} needs a non-empty series", self.name))
        })?;

        if prices.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataFormatError(format!(
                "{} cannot be fitted on missing values",
                self.name
            )));
        }

        let k = self.parameter_count();
        let required = self.d + self.p + k + 1;
        if prices.len() < required {
            return Err(ForecastError::InsufficientData(format!(
                "Insufficient data for {}. Need at least {} observations, have {}.",
                self.name,
                required,
                prices.len()
            )));
        }

        let differenced = difference(prices, self.d);
        let rows = differenced.len() - self.p;

        // Regress w_t on [1?, w_{t-1}, ..., w_{t-p}]
        let offset = usize::from(self.include_constant);
        let x = DMatrix::from_fn(rows, k, |r, c| {
            if c < offset {
                1.0
            } else {
                differenced[r + self.p - (c - offset) - 1]
            }
        });
        let y = DVector::from_iterator(rows, differenced[self.p..].iter().copied());

        let beta = if k == 0 {
            DVector::zeros(0)
        } else {
            solve_least_squares(&x, &y)?
        };

        let constant = if self.include_constant { beta[0] } else { 0.0 };
        let ar_coefficients: Vec<f64> = beta.iter().skip(offset).copied().collect();

        let residuals = if k == 0 { y.clone() } else { &y - &x * &beta };
        let sigma2 = residuals.norm_squared() / rows as f64;

        if !sigma2.is_finite() || ar_coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::ModelFitError(format!(
                "{} produced non-finite estimates",
                self.name
            )));
        }

        debug!(
            model = %self.name,
            ?ar_coefficients,
            constant,
            sigma2,
            "Fitted ARIMA model"
        );

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            p: self.p,
            d: self.d,
            ar_coefficients,
            constant,
            sigma2,
            historical_data: prices.to_vec(),
            differenced,
            last_date,
            confidence: self.confidence,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Fitted AR coefficients, lag 1 first
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Intercept of the differenced series
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Residual variance of the fit
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Next differenced value given the history so far
    fn step(&self, differenced: &[f64]) -> f64 {
        let n = differenced.len();
        self.constant
            + self
                .ar_coefficients
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * differenced[n - 1 - i])
                .sum::<f64>()
    }

    /// Half-widths of the forecast intervals for horizons 1..=horizon
    fn interval_half_widths(&self, horizon: usize) -> Result<Vec<f64>> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ModelFitError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + self.confidence / 2.0);

        let psi = psi_weights(&self.ar_coefficients, self.d, horizon);
        let mut cumulative = 0.0;
        Ok(psi
            .iter()
            .map(|w| {
                cumulative += w * w;
                z * (self.sigma2 * cumulative).sqrt()
            })
            .collect())
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let mut extended = self.differenced.clone();
        let mut steps = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = self.step(&extended);
            extended.push(next);
            steps.push(next);
        }

        let values = integrate(&steps, &self.historical_data, self.d);
        let intervals = values
            .iter()
            .zip(self.interval_half_widths(horizon)?)
            .map(|(v, half)| (v - half, v + half))
            .collect();

        ForecastResult::new_with_intervals(values, future_dates(self.last_date, horizon), intervals)
    }

    fn predict(&self, data: &DailySeries) -> Result<ForecastResult> {
        let prices = data.values();
        let differenced = difference(prices, self.d);
        let coefficients = differencing_coefficients(self.d);
        let warm_up = self.p + self.d;

        // One-step-ahead predictions; the first p + d values have no full lag set
        let predictions = (0..prices.len())
            .map(|t| {
                if t < warm_up {
                    return f64::NAN;
                }
                let lags = &differenced[..t - self.d];
                let step = self.step(lags);
                step - coefficients
                    .iter()
                    .enumerate()
                    .map(|(k, c)| c * prices[t - k - 1])
                    .sum::<f64>()
            })
            .collect();

        ForecastResult::new(predictions, data.dates().to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Difference a series `d` times
pub fn difference(data: &[f64], d: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..d {
        if result.len() < 2 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing, anchoring each level on the end of `history`
fn integrate(steps: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    let mut result = steps.to_vec();
    for level in (0..d).rev() {
        let mut acc = difference(history, level).last().copied().unwrap_or(0.0);
        result = result
            .iter()
            .map(|step| {
                acc += step;
                acc
            })
            .collect();
    }
    result
}

/// Coefficients c_1..c_d of (1 - B)^d = 1 + sum c_k B^k
fn differencing_coefficients(d: usize) -> Vec<f64> {
    let mut coefficients = Vec::with_capacity(d);
    let mut binomial = 1.0;
    for k in 1..=d {
        binomial = binomial * (d - k + 1) as f64 / k as f64;
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        coefficients.push(sign * binomial);
    }
    coefficients
}

/// MA(infinity) weights of phi(B) (1 - B)^d, psi_0 = 1
fn psi_weights(ar: &[f64], d: usize, horizon: usize) -> Vec<f64> {
    let mut poly = Vec::with_capacity(ar.len() + d + 1);
    poly.push(1.0);
    poly.extend(ar.iter().map(|c| -c));
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }

    let mut psi: Vec<f64> = Vec::with_capacity(horizon);
    for j in 0..horizon {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let value = (1..poly.len().min(j + 1))
            .map(|i| -poly[i] * psi[j - i])
            .sum();
        psi.push(value);
    }
    psi
}

/// Least squares by SVD; rank-deficient designs give the minimum-norm solution
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let largest = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);

    if !largest.is_finite() {
        return Err(ForecastError::ModelFitError(
            "Design matrix has non-finite singular values".to_string(),
        ));
    }
    if largest == 0.0 {
        // Flat differenced series: nothing to explain
        return Ok(DVector::zeros(x.ncols()));
    }

    svd.solve(y, largest * 1e-10)
        .map_err(|e| ForecastError::ModelFitError(e.to_string()))
}

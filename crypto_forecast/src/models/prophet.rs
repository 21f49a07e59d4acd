//! Additive trend and seasonality model in the style of Prophet
//!
//! `y(t) = trend(t) + seasonality(t) + noise`, where the trend is piecewise
//! linear with changepoints spread over the early part of the history and
//! each seasonality is a truncated Fourier series. Parameters are the MAP
//! estimate under Gaussian priors, which reduces to ridge-penalised least
//! squares with the noise variance re-estimated until it settles.

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::models::{future_dates, ForecastModel, ForecastResult, TrainedForecastModel};
use chrono::{Datelike, NaiveDate};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, Poisson};
use statrs::statistics::{Data, OrderStatistics};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// `NaiveDate::num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Prior scale of the trend slope and offset
const TREND_PRIOR_SCALE: f64 = 5.0;

/// Noise variance bounds for the MAP iterations
const INITIAL_SIGMA2: f64 = 0.25;
const MIN_SIGMA2: f64 = 1e-6;
const MAX_FIT_ITERATIONS: usize = 100;

/// Whether a seasonal component is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityToggle {
    /// Decide from the span and spacing of the training data
    Auto,
    Enabled,
    Disabled,
}

impl From<bool> for SeasonalityToggle {
    fn from(enabled: bool) -> Self {
        if enabled {
            SeasonalityToggle::Enabled
        } else {
            SeasonalityToggle::Disabled
        }
    }
}

/// Fourier seasonality with period in days
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period: f64,
    pub order: usize,
}

impl Seasonality {
    fn yearly() -> Self {
        Self {
            name: "yearly",
            period: 365.25,
            order: 10,
        }
    }

    fn weekly() -> Self {
        Self {
            name: "weekly",
            period: 7.0,
            order: 3,
        }
    }

    fn daily() -> Self {
        Self {
            name: "daily",
            period: 1.0,
            order: 4,
        }
    }

    /// `[sin(2 pi 1 t / P), cos(2 pi 1 t / P), ..., cos(2 pi N t / P)]`
    fn features(&self, t_days: f64) -> impl Iterator<Item = f64> + '_ {
        (1..=self.order).flat_map(move |k| {
            let x = 2.0 * PI * k as f64 * t_days / self.period;
            [x.sin(), x.cos()]
        })
    }
}

/// Prophet-style forecasting model
#[derive(Debug, Clone)]
pub struct ProphetModel {
    /// Name of the model
    name: String,
    /// Maximum number of potential trend changepoints
    n_changepoints: usize,
    /// Share of the history in which changepoints are placed
    changepoint_range: f64,
    /// Prior scale of the trend changes
    changepoint_prior_scale: f64,
    /// Prior scale of the Fourier coefficients
    seasonality_prior_scale: f64,
    yearly_seasonality: SeasonalityToggle,
    weekly_seasonality: SeasonalityToggle,
    daily_seasonality: SeasonalityToggle,
    /// Coverage of the uncertainty intervals
    interval_width: f64,
    /// Monte Carlo draws for the intervals, 0 disables them
    uncertainty_samples: usize,
    /// Seed of the interval simulation
    seed: u64,
}

/// Trained Prophet-style model
#[derive(Debug, Clone)]
pub struct TrainedProphetModel {
    name: String,
    /// First training date, t = 0
    start: NaiveDate,
    /// Last training date, t = 1
    last_date: NaiveDate,
    /// Training span in days
    span_days: f64,
    /// Target scale (absolute maximum of the training values)
    y_scale: f64,
    /// Changepoint locations in scaled time
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    /// Base growth rate
    k: f64,
    /// Base offset
    m: f64,
    /// Rate adjustments at each changepoint
    deltas: Vec<f64>,
    /// Fourier coefficients, seasonality by seasonality
    beta: Vec<f64>,
    /// Noise standard deviation in scaled units
    sigma: f64,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
}

impl Default for ProphetModel {
    fn default() -> Self {
        Self {
            name: "Prophet".to_string(),
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_seasonality: SeasonalityToggle::Auto,
            weekly_seasonality: SeasonalityToggle::Auto,
            daily_seasonality: SeasonalityToggle::Auto,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }
}

impl ProphetModel {
    /// Create a model with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_yearly_seasonality<T: Into<SeasonalityToggle>>(mut self, toggle: T) -> Self {
        self.yearly_seasonality = toggle.into();
        self
    }

    pub fn with_weekly_seasonality<T: Into<SeasonalityToggle>>(mut self, toggle: T) -> Self {
        self.weekly_seasonality = toggle.into();
        self
    }

    pub fn with_daily_seasonality<T: Into<SeasonalityToggle>>(mut self, toggle: T) -> Self {
        self.daily_seasonality = toggle.into();
        self
    }

    /// Set the maximum number of trend changepoints
    pub fn with_changepoints(mut self, n_changepoints: usize) -> Self {
        self.n_changepoints = n_changepoints;
        self
    }

    /// Set the prior scale of the trend changes
    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Result<Self> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Changepoint prior scale must be positive, got {}",
                scale
            )));
        }
        self.changepoint_prior_scale = scale;
        Ok(self)
    }

    /// Set the coverage of the uncertainty intervals
    pub fn with_interval_width(mut self, width: f64) -> Result<Self> {
        if !(width > 0.0 && width < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Interval width must be between 0 and 1, got {}",
                width
            )));
        }
        self.interval_width = width;
        Ok(self)
    }

    pub fn with_uncertainty_samples(mut self, samples: usize) -> Self {
        self.uncertainty_samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Seasonalities fitted on data spanning `span_days` with the given spacing
    fn active_seasonalities(&self, span_days: f64, min_spacing_days: f64) -> Vec<Seasonality> {
        let rules = [
            (self.yearly_seasonality, Seasonality::yearly(), span_days >= 730.0),
            (
                self.weekly_seasonality,
                Seasonality::weekly(),
                span_days >= 14.0 && min_spacing_days < 7.0,
            ),
            (
                self.daily_seasonality,
                Seasonality::daily(),
                span_days >= 2.0 && min_spacing_days < 1.0,
            ),
        ];

        rules
            .into_iter()
            .filter(|(toggle, _, auto)| match toggle {
                SeasonalityToggle::Auto => *auto,
                SeasonalityToggle::Enabled => true,
                SeasonalityToggle::Disabled => false,
            })
            .map(|(_, seasonality, _)| seasonality)
            .collect()
    }

    /// Changepoint row indexes, evenly spread over the first part of history
    fn changepoint_indexes(&self, n: usize) -> Vec<usize> {
        let hist_size = (n as f64 * self.changepoint_range).floor() as usize;
        let count = self.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last = (hist_size - 1) as f64;
        (1..=count)
            .map(|i| (last * i as f64 / count as f64).round() as usize)
            .collect()
    }
}

impl ForecastModel for ProphetModel {
    type Trained = TrainedProphetModel;

    fn train(&self, data: &DailySeries) -> Result<TrainedProphetModel> {
        let n = data.len();
        let (start, last_date) = match (data.first_date(), data.last_date()) {
            (Some(first), Some(last)) if n >= 2 => (first, last),
            _ => {
                return Err(ForecastError::InsufficientData(format!(
                    "{} needs at least 2 observations, have {}",
                    self.name, n
                )))
            }
        };

        let values = data.values();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataFormatError(format!(
                "{} cannot be fitted on missing values",
                self.name
            )));
        }

        let span_days = (last_date - start).num_days() as f64;
        let seasonalities = self.active_seasonalities(span_days, 1.0);

        let y_scale = match values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) {
            s if s > 0.0 => s,
            _ => 1.0,
        };

        let t: Vec<f64> = data
            .dates()
            .iter()
            .map(|d| (*d - start).num_days() as f64 / span_days)
            .collect();
        let changepoints: Vec<f64> = self
            .changepoint_indexes(n)
            .into_iter()
            .map(|i| t[i])
            .collect();

        let n_seasonal: usize = seasonalities.iter().map(|s| 2 * s.order).sum();
        let n_cols = 2 + changepoints.len() + n_seasonal;

        // Columns: slope, offset, changepoint hinges, Fourier terms
        let mut x = DMatrix::zeros(n, n_cols);
        for (row, date) in data.dates().iter().enumerate() {
            x[(row, 0)] = t[row];
            x[(row, 1)] = 1.0;
            for (j, s) in changepoints.iter().enumerate() {
                x[(row, 2 + j)] = (t[row] - s).max(0.0);
            }
            let t_days = days_since_epoch(*date);
            let fourier = seasonalities.iter().flat_map(|s| s.features(t_days));
            for (j, value) in fourier.enumerate() {
                x[(row, 2 + changepoints.len() + j)] = value;
            }
        }
        let y = DVector::from_iterator(n, values.iter().map(|v| v / y_scale));

        let prior_scales: Vec<f64> = [TREND_PRIOR_SCALE, TREND_PRIOR_SCALE]
            .into_iter()
            .chain(std::iter::repeat(self.changepoint_prior_scale).take(changepoints.len()))
            .chain(std::iter::repeat(self.seasonality_prior_scale).take(n_seasonal))
            .collect();

        let xt = x.transpose();
        let xtx = &xt * &x;
        let xty = &xt * &y;

        let mut sigma2 = INITIAL_SIGMA2;
        let mut params = DVector::zeros(n_cols);
        for iteration in 0..MAX_FIT_ITERATIONS {
            let mut system = xtx.clone();
            for (i, scale) in prior_scales.iter().enumerate() {
                system[(i, i)] += sigma2 / (scale * scale);
            }

            let cholesky = system.cholesky().ok_or_else(|| {
                ForecastError::ModelFitError(format!(
                    "{}: normal equations are not positive definite",
                    self.name
                ))
            })?;
            params = cholesky.solve(&xty);

            let rss = (&y - &x * &params).norm_squared();
            let next = (rss / n as f64).max(MIN_SIGMA2);
            if !next.is_finite() {
                return Err(ForecastError::ModelFitError(format!(
                    "{}: residual variance is not finite",
                    self.name
                )));
            }

            let settled = (next - sigma2).abs() <= 1e-8 * sigma2;
            sigma2 = next;
            if settled {
                debug!(iteration, sigma2, "Prophet noise variance settled");
                break;
            }
        }

        if params.iter().any(|p| !p.is_finite()) {
            return Err(ForecastError::ModelFitError(format!(
                "{} produced non-finite parameters",
                self.name
            )));
        }

        let deltas: Vec<f64> = params.rows(2, changepoints.len()).iter().copied().collect();
        let beta: Vec<f64> = params
            .rows(2 + changepoints.len(), n_seasonal)
            .iter()
            .copied()
            .collect();

        debug!(
            k = params[0],
            m = params[1],
            changepoints = changepoints.len(),
            seasonalities = ?seasonalities.iter().map(|s| s.name).collect::<Vec<_>>(),
            sigma2,
            "Fitted Prophet model"
        );

        Ok(TrainedProphetModel {
            name: self.name.clone(),
            start,
            last_date,
            span_days,
            y_scale,
            changepoints,
            seasonalities,
            k: params[0],
            m: params[1],
            deltas,
            beta,
            sigma: sigma2.sqrt(),
            interval_width: self.interval_width,
            uncertainty_samples: self.uncertainty_samples,
            seed: self.seed,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedProphetModel {
    /// Fitted seasonal components
    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    /// Changepoint locations in scaled time
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    /// Base growth rate and offset in scaled units
    pub fn trend_parameters(&self) -> (f64, f64) {
        (self.k, self.m)
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn trend(&self, t: f64) -> f64 {
        self.k * t
            + self.m
            + self
                .changepoints
                .iter()
                .zip(&self.deltas)
                .map(|(s, delta)| delta * (t - s).max(0.0))
                .sum::<f64>()
    }

    fn seasonal(&self, date: NaiveDate) -> f64 {
        let t_days = days_since_epoch(date);
        self.seasonalities
            .iter()
            .flat_map(|s| s.features(t_days))
            .zip(&self.beta)
            .map(|(feature, beta)| feature * beta)
            .sum()
    }

    /// Point estimates in data units for each date
    fn estimate(&self, dates: Vec<NaiveDate>) -> Result<ForecastResult> {
        let t: Vec<f64> = dates.iter().map(|d| self.scaled_time(*d)).collect();
        let scaled: Vec<f64> = dates
            .iter()
            .zip(&t)
            .map(|(d, &t)| self.trend(t) + self.seasonal(*d))
            .collect();

        let values = scaled.iter().map(|v| v * self.y_scale).collect();
        let intervals = self.uncertainty_intervals(&t, &scaled)?;
        ForecastResult::new_with_intervals(values, dates, intervals)
    }

    /// Simulated intervals: future trend changes plus observation noise
    fn uncertainty_intervals(&self, t: &[f64], scaled: &[f64]) -> Result<Vec<(f64, f64)>> {
        if self.uncertainty_samples == 0 {
            warn!(
                model = %self.name,
                "Uncertainty sampling disabled, intervals collapse to the estimate"
            );
            return Ok(scaled
                .iter()
                .map(|v| (v * self.y_scale, v * self.y_scale))
                .collect());
        }

        let fit_error = |e: String| ForecastError::ModelFitError(e);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, self.sigma).map_err(|e| fit_error(e.to_string()))?;

        let t_max = t.iter().copied().fold(1.0_f64, f64::max);
        let mean_delta =
            self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len().max(1) as f64;
        let magnitude = Exp::new(1.0 / (mean_delta + 1e-8)).map_err(|e| fit_error(e.to_string()))?;
        let change_count = if t_max > 1.0 && !self.changepoints.is_empty() {
            let rate = self.changepoints.len() as f64 * (t_max - 1.0);
            Some(Poisson::new(rate).map_err(|e| fit_error(e.to_string()))?)
        } else {
            None
        };

        let mut draws = vec![Vec::with_capacity(self.uncertainty_samples); t.len()];
        for _ in 0..self.uncertainty_samples {
            let count = match &change_count {
                Some(poisson) => {
                    let count: f64 = poisson.sample(&mut rng);
                    count as usize
                }
                None => 0,
            };

            // Laplace magnitudes as exponentials with a random sign
            let changes: Vec<(f64, f64)> = (0..count)
                .map(|_| {
                    let location = rng.gen_range(1.0..t_max);
                    let size = magnitude.sample(&mut rng);
                    (location, if rng.gen::<bool>() { size } else { -size })
                })
                .collect();

            for (i, &ti) in t.iter().enumerate() {
                let drift: f64 = changes
                    .iter()
                    .map(|(location, delta)| delta * (ti - location).max(0.0))
                    .sum();
                draws[i].push((scaled[i] + drift + noise.sample(&mut rng)) * self.y_scale);
            }
        }

        let lower_tau = (1.0 - self.interval_width) / 2.0;
        let upper_tau = 1.0 - lower_tau;
        Ok(draws
            .into_iter()
            .map(|samples| {
                let mut data = Data::new(samples);
                (data.quantile(lower_tau), data.quantile(upper_tau))
            })
            .collect())
    }
}

impl TrainedForecastModel for TrainedProphetModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        self.estimate(future_dates(self.last_date, horizon))
    }

    fn predict(&self, data: &DailySeries) -> Result<ForecastResult> {
        self.estimate(data.dates().to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    (date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE) as f64
}

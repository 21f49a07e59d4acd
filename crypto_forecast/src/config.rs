//! Run configuration
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! gives the standard run: one year of daily bitcoin prices in USD.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Market-data asset id, e.g. `bitcoin`
    pub asset: String,
    /// Quote currency, e.g. `usd`
    pub vs_currency: String,
    /// Lookback window in days
    pub days: u32,
    /// Share of the daily series used for training
    pub train_ratio: f64,
    /// Period of the seasonal decomposition in days
    pub seasonal_period: usize,
    /// Short moving-average window
    pub short_window: usize,
    /// Long moving-average window
    pub long_window: usize,
    /// ARIMA (p, d, q)
    pub arima_order: (usize, usize, usize),
    /// Fit the daily Fourier seasonality in the Prophet-style model
    pub prophet_daily_seasonality: bool,
    /// Root under which `data/`, `plots/` and `results/` are created
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            asset: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            days: 365,
            train_ratio: 0.8,
            seasonal_period: 30,
            short_window: 7,
            long_window: 30,
            arima_order: (5, 1, 0),
            prophet_daily_seasonality: true,
            output_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ForecastError::ConfigError(format!("Invalid configuration: {}", e)))
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.asset.trim().is_empty() {
            return Err(invalid("asset", "must not be empty"));
        }
        if self.vs_currency.trim().is_empty() {
            return Err(invalid("vs_currency", "must not be empty"));
        }
        if self.days == 0 {
            return Err(invalid("days", "must be positive"));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(invalid("train_ratio", "must be between 0 and 1"));
        }
        if self.seasonal_period < 2 {
            return Err(invalid("seasonal_period", "must be at least 2"));
        }
        if self.short_window == 0 {
            return Err(invalid("short_window", "must be positive"));
        }
        if self.long_window == 0 {
            return Err(invalid("long_window", "must be positive"));
        }
        if self.arima_order.2 > 0 {
            return Err(invalid("arima_order", "moving-average terms are not supported"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ForecastError {
    ForecastError::ConfigError(format!("{} {}", key, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(r#"{"asset": "ethereum", "days": 90}"#).unwrap();
        assert_eq!(config.asset, "ethereum");
        assert_eq!(config.days, 90);
        assert_eq!(config.vs_currency, "usd");
        assert_eq!(config.arima_order, (5, 1, 0));
    }
}

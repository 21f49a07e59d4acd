//! # Crypto Forecast
//!
//! A Rust library for exploratory analysis and forecasting of a daily
//! cryptocurrency price series.
//!
//! ## Features
//!
//! - Price history from a market-chart API or a persisted CSV
//! - Daily resampling with forward-filled gaps
//! - Multiplicative seasonal decomposition and trailing moving averages
//! - Forecasting models (ARIMA, Prophet-style trend and seasonality)
//! - Mean absolute error and an averaged ensemble
//! - PNG charts, CSV series and plain-text metrics on disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crypto_forecast::artifacts::FileArtifactStore;
//! use crypto_forecast::market::CoinGeckoClient;
//! use crypto_forecast::{Pipeline, PipelineConfig};
//!
//! fn main() -> Result<(), crypto_forecast::ForecastError> {
//!     let config = PipelineConfig::default();
//!     let source = CoinGeckoClient::new()?;
//!     let store = FileArtifactStore::new(&config.output_dir);
//!
//!     let report = Pipeline::new(config, &source, &store)?.run()?;
//!     println!("ARIMA MAE: {:.2}", report.arima_mae);
//!     Ok(())
//! }
//! ```
//!
//! Models can also be used on their own:
//!
//! ```rust
//! use chrono::NaiveDate;
//! use crypto_forecast::data::DailySeries;
//! use crypto_forecast::models::{ArimaModel, ForecastModel, TrainedForecastModel};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = DailySeries::from_start(start, (0..40).map(|i| 100.0 + i as f64).collect());
//!
//! let trained = ArimaModel::new(2, 1, 0).unwrap().train(&series).unwrap();
//! let forecast = trained.forecast(5).unwrap();
//! assert_eq!(forecast.horizons(), 5);
//! ```

pub mod analysis;
pub mod artifacts;
pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod market;
pub mod metrics;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DailySeries, DataLoader, PriceSeries};
pub use crate::error::ForecastError;
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::pipeline::{Pipeline, RunReport};

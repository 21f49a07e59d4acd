//! # Trade Math
//!
//! Numeric kernels for price series analysis.
//! This crate provides the trailing moving averages and the classical
//! seasonal decomposition used by the forecasting pipeline.

use thiserror::Error;

pub mod decomposition;
pub mod moving_averages;

pub use decomposition::{seasonal_decompose, Decomposition, DecompositionModel};
pub use moving_averages::{rolling_mean, SimpleMovingAverage};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

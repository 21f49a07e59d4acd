//! Error types for the crypto_forecast crate

use std::process::ExitCode;
use thiserror::Error;
use trade_math::MathError;

/// Custom error types for the crypto_forecast crate
///
/// Every variant is fatal to a run; nothing is retried or downgraded.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The market-data request failed or returned a non-success status
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A response body or persisted file did not have the expected shape
    #[error("Data format error: {0}")]
    DataFormatError(String),

    /// The series is too short for the requested operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A model could not be fitted (singular system, non-finite estimates)
    #[error("Model fit error: {0}")]
    ModelFitError(String),

    /// Forecast and actual values do not line up
    #[error("Alignment error: {0}")]
    AlignmentError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error loading or validating the run configuration
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error rendering a chart
    #[error("Chart error: {0}")]
    ChartError(String),

    /// Error reading or writing CSV artifacts
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            MathError::InvalidInput(msg) => ForecastError::DataFormatError(msg),
            MathError::CalculationError(msg) => ForecastError::ModelFitError(msg),
        }
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::DataFormatError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}

impl From<image::ImageError> for ForecastError {
    fn from(err: image::ImageError) -> Self {
        ForecastError::ChartError(err.to_string())
    }
}

impl ForecastError {
    /// Process exit status reported for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            ForecastError::IoError(_) | ForecastError::CsvError(_) => 1,
            ForecastError::ConfigError(_) | ForecastError::InvalidParameter(_) => 2,
            ForecastError::NetworkError(_) => 3,
            ForecastError::DataFormatError(_) => 4,
            ForecastError::InsufficientData(_) => 5,
            ForecastError::ModelFitError(_) => 6,
            ForecastError::AlignmentError(_) => 7,
            ForecastError::ChartError(_) => 8,
        }
    }
}

impl From<&ForecastError> for ExitCode {
    fn from(err: &ForecastError) -> Self {
        ExitCode::from(err.exit_code())
    }
}

//! Descriptive analysis of the daily series

use crate::config::PipelineConfig;
use crate::data::DailySeries;
use crate::error::Result;
use tracing::debug;
use trade_math::{rolling_mean, seasonal_decompose, Decomposition, DecompositionModel};

/// Multiplicative decomposition and the two trailing moving averages
#[derive(Debug, Clone)]
pub struct DescriptiveAnalysis {
    pub decomposition: Decomposition,
    /// Short trailing mean, NaN for the first `short_window - 1` days
    pub short_ma: Vec<f64>,
    /// Long trailing mean, NaN for the first `long_window - 1` days
    pub long_ma: Vec<f64>,
}

/// Decompose the series and compute its moving averages
///
/// Fails with `InsufficientData` when the series holds fewer than two
/// seasonal periods, and with `DataFormatError` on non-positive prices.
pub fn analyze(series: &DailySeries, config: &PipelineConfig) -> Result<DescriptiveAnalysis> {
    let values = series.values();

    let decomposition = seasonal_decompose(
        values,
        config.seasonal_period,
        DecompositionModel::Multiplicative,
    )?;
    let short_ma = rolling_mean(values, config.short_window)?;
    let long_ma = rolling_mean(values, config.long_window)?;

    debug!(
        period = config.seasonal_period,
        short_window = config.short_window,
        long_window = config.long_window,
        "Computed descriptive analysis"
    );

    Ok(DescriptiveAnalysis {
        decomposition,
        short_ma,
        long_ma,
    })
}

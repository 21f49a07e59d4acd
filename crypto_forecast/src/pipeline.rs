//! The forecasting pipeline
//!
//! One linear pass: Acquire -> Resample -> Analyze -> Forecast -> Evaluate.
//! Each stage writes its artifacts before the next one starts and the first
//! error ends the run, leaving whatever was already written in place.

use crate::analysis::{analyze, DescriptiveAnalysis};
use crate::artifacts::ArtifactStore;
use crate::charts::{colors, Band, Chart, Panel, Series, SeriesStyle};
use crate::config::PipelineConfig;
use crate::data::{resample_daily, DailySeries, PriceSeries, TrainTestSplit};
use crate::error::Result;
use crate::market::MarketDataSource;
use crate::metrics::{ensemble_mean, mean_absolute_error, MetricReport};
use crate::models::{
    ArimaModel, ForecastModel, ForecastResult, ProphetModel, TrainedForecastModel,
};
use image::Rgb;
use tracing::info;

/// Chart artifact names, in the order a run writes them
pub const DAILY_PRICES_CHART: &str = "daily_prices";
pub const DECOMPOSITION_CHART: &str = "seasonal_decomposition";
pub const MOVING_AVERAGES_CHART: &str = "moving_averages";
pub const ARIMA_CHART: &str = "arima_forecast";
pub const PROPHET_CHART: &str = "prophet_forecast";
pub const ENSEMBLE_CHART: &str = "ensemble_forecast";

/// Metric artifact names
pub const ARIMA_METRIC: &str = "arima_mae";
pub const PROPHET_METRIC: &str = "prophet_mae";

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Length of the daily series
    pub days: usize,
    pub train_len: usize,
    pub test_len: usize,
    pub arima_mae: f64,
    pub prophet_mae: f64,
    pub ensemble_mae: f64,
}

/// Test-horizon forecasts of both models
#[derive(Debug, Clone)]
struct Forecasts {
    split: TrainTestSplit,
    arima: ForecastResult,
    prophet: ForecastResult,
}

/// A configured run over injected data source and artifact store
pub struct Pipeline<'a> {
    config: PipelineConfig,
    source: &'a dyn MarketDataSource,
    store: &'a dyn ArtifactStore,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline; the configuration is validated up front
    pub fn new(
        config: PipelineConfig,
        source: &'a dyn MarketDataSource,
        store: &'a dyn ArtifactStore,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            store,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once, in order
    pub fn run(&self) -> Result<RunReport> {
        let prices = self.acquire()?;
        let daily = self.resample(&prices)?;
        self.describe(&daily)?;
        let forecasts = self.forecast(&daily)?;
        self.evaluate(&daily, &forecasts)
    }

    fn acquire(&self) -> Result<PriceSeries> {
        let config = &self.config;
        info!(
            asset = %config.asset,
            vs_currency = %config.vs_currency,
            days = config.days,
            "Acquire: fetching price history"
        );

        let prices = self
            .source
            .fetch_price_history(&config.asset, &config.vs_currency, config.days)?;
        self.store.save_price_series(&config.asset, &prices)?;

        info!(samples = prices.len(), "Acquire: done");
        Ok(prices)
    }

    fn resample(&self, prices: &PriceSeries) -> Result<DailySeries> {
        info!("Resample: bucketing to daily frequency");

        let daily = resample_daily(prices)?;
        self.store.save_daily_series(&self.config.asset, &daily)?;

        let chart = Chart::new(format!("Daily {} prices", self.config.asset)).with_panel(
            Panel::new("Price").with_series(Series::line(
                "Price",
                daily.dates(),
                daily.values(),
                colors::BLUE,
            )),
        );
        self.store.save_chart(DAILY_PRICES_CHART, &chart)?;

        info!(days = daily.len(), "Resample: done");
        Ok(daily)
    }

    fn describe(&self, daily: &DailySeries) -> Result<DescriptiveAnalysis> {
        info!(period = self.config.seasonal_period, "Analyze: decomposing daily series");

        let analysis = analyze(daily, &self.config)?;
        self.store
            .save_chart(DECOMPOSITION_CHART, &decomposition_chart(daily, &analysis))?;
        self.store.save_chart(
            MOVING_AVERAGES_CHART,
            &moving_averages_chart(daily, &analysis, &self.config),
        )?;

        info!("Analyze: done");
        Ok(analysis)
    }

    fn forecast(&self, daily: &DailySeries) -> Result<Forecasts> {
        let split = daily.split(self.config.train_ratio)?;
        info!(
            train = split.train.len(),
            test = split.test.len(),
            "Forecast: fitting models on the training prefix"
        );

        let (p, d, q) = self.config.arima_order;
        let arima_model = ArimaModel::new(p, d, q)?;
        let (_, arima) = horizon_forecast(&arima_model, &split)?;
        let arima_chart = Chart::new(format!("{} forecast", arima_model.name())).with_panel(
            actual_panel("ARIMA", &split)
                .with_band(interval_band(&arima, colors::RED))
                .with_series(
                    Series::line("ARIMA", arima.dates(), arima.values(), colors::RED)
                        .with_style(SeriesStyle::Dashed),
                ),
        );
        self.store.save_chart(ARIMA_CHART, &arima_chart)?;

        let prophet_model = ProphetModel::new()
            .with_daily_seasonality(self.config.prophet_daily_seasonality);
        let (trained, prophet) = horizon_forecast(&prophet_model, &split)?;
        let fitted = trained.predict(&split.train)?;
        let prophet_chart = Chart::new("Prophet forecast").with_panel(
            actual_panel("Prophet", &split)
                .with_band(interval_band(&fitted, colors::PURPLE))
                .with_band(interval_band(&prophet, colors::PURPLE))
                .with_series(Series::line(
                    "Fitted",
                    fitted.dates(),
                    fitted.values(),
                    colors::PURPLE,
                ))
                .with_series(
                    Series::line("Prophet", prophet.dates(), prophet.values(), colors::PURPLE)
                        .with_style(SeriesStyle::Dashed),
                ),
        );
        self.store.save_chart(PROPHET_CHART, &prophet_chart)?;

        info!(horizon = split.test.len(), "Forecast: done");
        Ok(Forecasts {
            split,
            arima,
            prophet,
        })
    }

    fn evaluate(&self, daily: &DailySeries, forecasts: &Forecasts) -> Result<RunReport> {
        info!("Evaluate: scoring forecasts against the test suffix");
        let test = &forecasts.split.test;

        let arima_mae = mean_absolute_error(&forecasts.arima, test)?;
        self.store
            .save_metric(ARIMA_METRIC, &MetricReport::mae("ARIMA", arima_mae))?;

        let prophet_mae = mean_absolute_error(&forecasts.prophet, test)?;
        self.store
            .save_metric(PROPHET_METRIC, &MetricReport::mae("Prophet", prophet_mae))?;

        let ensemble = ensemble_mean(&[&forecasts.arima, &forecasts.prophet])?;
        let ensemble_mae = mean_absolute_error(&ensemble, test)?;

        let chart = Chart::new("Ensemble forecast").with_panel(
            Panel::new("Ensemble")
                .with_series(Series::line("Actual", test.dates(), test.values(), colors::GREEN))
                .with_series(
                    Series::line("Ensemble", ensemble.dates(), ensemble.values(), colors::RED)
                        .with_style(SeriesStyle::Dashed),
                ),
        );
        self.store.save_chart(ENSEMBLE_CHART, &chart)?;

        info!(arima_mae, prophet_mae, ensemble_mae, "Evaluate: done");
        Ok(RunReport {
            days: daily.len(),
            train_len: forecasts.split.train.len(),
            test_len: test.len(),
            arima_mae,
            prophet_mae,
            ensemble_mae,
        })
    }
}

/// Train on the prefix and forecast exactly the dates of the test suffix
pub fn horizon_forecast<M: ForecastModel>(
    model: &M,
    split: &TrainTestSplit,
) -> Result<(M::Trained, ForecastResult)> {
    let trained = model.train(&split.train)?;
    let forecast = trained
        .forecast(split.test.len())?
        .aligned_to(split.test.dates())?;
    Ok((trained, forecast))
}

fn actual_panel(title: &str, split: &TrainTestSplit) -> Panel {
    Panel::new(title)
        .with_series(Series::line(
            "Train",
            split.train.dates(),
            split.train.values(),
            colors::BLUE,
        ))
        .with_series(Series::line(
            "Test",
            split.test.dates(),
            split.test.values(),
            colors::GREEN,
        ))
}

fn interval_band(forecast: &ForecastResult, color: Rgb<u8>) -> Band {
    let intervals = forecast.intervals().unwrap_or(&[]);
    Band::from_intervals("Interval", forecast.dates(), intervals, color)
}

fn decomposition_chart(daily: &DailySeries, analysis: &DescriptiveAnalysis) -> Chart {
    let dates = daily.dates();
    let decomposition = &analysis.decomposition;

    Chart::new("Seasonal decomposition")
        .with_size(1200, 800)
        .with_panel(Panel::new("Observed").with_series(Series::line(
            "Observed",
            dates,
            daily.values(),
            colors::BLUE,
        )))
        .with_panel(Panel::new("Trend").with_series(Series::line(
            "Trend",
            dates,
            &decomposition.trend,
            colors::ORANGE,
        )))
        .with_panel(Panel::new("Seasonal").with_series(Series::line(
            "Seasonal",
            dates,
            &decomposition.seasonal,
            colors::GREEN,
        )))
        .with_panel(
            Panel::new("Residual").with_series(
                Series::line("Residual", dates, &decomposition.residual, colors::GRAY)
                    .with_style(SeriesStyle::Points),
            ),
        )
}

fn moving_averages_chart(
    daily: &DailySeries,
    analysis: &DescriptiveAnalysis,
    config: &PipelineConfig,
) -> Chart {
    let dates = daily.dates();
    Chart::new("Moving averages").with_panel(
        Panel::new("Price")
            .with_series(Series::line("Price", dates, daily.values(), colors::BLUE))
            .with_series(Series::line(
                format!("{}-day MA", config.short_window),
                dates,
                &analysis.short_ma,
                colors::ORANGE,
            ))
            .with_series(Series::line(
                format!("{}-day MA", config.long_window),
                dates,
                &analysis.long_ma,
                colors::GREEN,
            )),
    )
}

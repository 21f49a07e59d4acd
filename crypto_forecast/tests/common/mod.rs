//! Shared fixtures: synthetic series, a stub price source and an in-memory artifact store

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use crypto_forecast::artifacts::ArtifactStore;
use crypto_forecast::charts::Chart;
use crypto_forecast::data::{DailySeries, PricePoint, PriceSeries};
use crypto_forecast::error::{ForecastError, Result};
use crypto_forecast::market::MarketDataSource;
use crypto_forecast::metrics::MetricReport;
use std::cell::RefCell;
use std::f64::consts::PI;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// `100 + 0.5 t + 5 sin(2 pi t / 7)`
pub fn trend_with_weekly_cycle(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 0.5 * i as f64 + 5.0 * (2.0 * PI * i as f64 / 7.0).sin())
        .collect()
}

pub fn daily_series(values: Vec<f64>) -> DailySeries {
    DailySeries::from_start(start_date(), values)
}

/// One sample per day at `hour` UTC
pub fn price_series(values: &[f64], hour: u32) -> PriceSeries {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, hour, 0, 0)
        .unwrap();
    let points = values
        .iter()
        .enumerate()
        .map(|(i, &price)| PricePoint {
            timestamp: start + Duration::days(i as i64),
            price,
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

/// Market-data source returning a fixed series, or a fixed failure
pub enum StubSource {
    Prices(PriceSeries),
    Failing,
}

impl MarketDataSource for StubSource {
    fn fetch_price_history(
        &self,
        _asset: &str,
        _vs_currency: &str,
        _days: u32,
    ) -> Result<PriceSeries> {
        match self {
            StubSource::Prices(series) => Ok(series.clone()),
            StubSource::Failing => Err(ForecastError::NetworkError(
                "stub source is offline".to_string(),
            )),
        }
    }
}

/// Artifact names in the order they were saved
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub saved: RefCell<Vec<String>>,
    pub metrics: RefCell<Vec<String>>,
}

impl RecordingStore {
    pub fn saved(&self) -> Vec<String> {
        self.saved.borrow().clone()
    }
}

impl ArtifactStore for RecordingStore {
    fn save_price_series(&self, asset: &str, _series: &PriceSeries) -> Result<()> {
        self.saved.borrow_mut().push(format!("data/{}_prices.csv", asset));
        Ok(())
    }

    fn save_daily_series(&self, asset: &str, _series: &DailySeries) -> Result<()> {
        self.saved
            .borrow_mut()
            .push(format!("data/daily_{}_prices.csv", asset));
        Ok(())
    }

    fn save_chart(&self, name: &str, chart: &Chart) -> Result<()> {
        assert!(!chart.panels.is_empty(), "chart {} has no panels", name);
        self.saved.borrow_mut().push(format!("plots/{}.png", name));
        Ok(())
    }

    fn save_metric(&self, name: &str, report: &MetricReport) -> Result<()> {
        self.saved.borrow_mut().push(format!("results/{}.txt", name));
        self.metrics.borrow_mut().push(report.to_string());
        Ok(())
    }
}

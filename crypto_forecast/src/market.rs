//! Market data acquisition
//!
//! The pipeline only sees the [`MarketDataSource`] port. [`CoinGeckoClient`]
//! talks to a market-chart HTTP endpoint; [`CsvPriceSource`] replays a price
//! series persisted by an earlier run.

use crate::data::{DataLoader, PriceSeries};
use crate::error::{ForecastError, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Public CoinGecko API root
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Source of raw price history for one asset
pub trait MarketDataSource {
    /// Fetch `days` of price history for `asset` quoted in `vs_currency`
    fn fetch_price_history(&self, asset: &str, vs_currency: &str, days: u32)
        -> Result<PriceSeries>;
}

/// Body of a market-chart response; only the price array is used
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

/// Parse a market-chart JSON body into a price series
///
/// The body must contain a `prices` array of `[timestamp_millis, price]` pairs.
pub fn parse_market_chart(body: &str) -> Result<PriceSeries> {
    let response: MarketChartResponse = serde_json::from_str(body).map_err(|e| {
        ForecastError::DataFormatError(format!("Unexpected market-chart response: {}", e))
    })?;
    PriceSeries::from_millis_pairs(&response.prices)
}

/// Blocking client for the CoinGecko market-chart endpoint
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    /// Create a client for the public API
    pub fn new() -> Result<Self> {
        Self::with_base_url(COINGECKO_BASE_URL)
    }

    /// Create a client for a mirror or a test server
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("crypto_forecast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn market_chart_url(&self, asset: &str) -> String {
        format!("{}/coins/{}/market_chart", self.base_url, asset)
    }
}

impl MarketDataSource for CoinGeckoClient {
    fn fetch_price_history(
        &self,
        asset: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<PriceSeries> {
        let url = self.market_chart_url(asset);
        info!(%url, vs_currency, days, "Requesting market chart");

        let days_param = days.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("vs_currency", vs_currency), ("days", days_param.as_str())])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::NetworkError(format!(
                "Market-chart request for '{}' failed with status {}",
                asset, status
            )));
        }

        let body = response.text()?;
        debug!(bytes = body.len(), "Received market-chart body");

        parse_market_chart(&body)
    }
}

/// Replays a raw price CSV written by a previous run
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl MarketDataSource for CsvPriceSource {
    fn fetch_price_history(
        &self,
        asset: &str,
        _vs_currency: &str,
        _days: u32,
    ) -> Result<PriceSeries> {
        info!(asset, path = %self.path.display(), "Loading persisted price history");
        DataLoader::from_csv(&self.path)
    }
}

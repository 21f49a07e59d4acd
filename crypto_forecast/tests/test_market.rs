mod common;

use common::price_series;
use crypto_forecast::artifacts::{ArtifactStore, FileArtifactStore};
use crypto_forecast::error::ForecastError;
use crypto_forecast::market::{
    parse_market_chart, CoinGeckoClient, CsvPriceSource, MarketDataSource,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::tempdir;

#[test]
fn test_parse_market_chart() {
    let body = r#"{
        "prices": [[1704067200000, 42000.5], [1704070800000, 42100.0], [1704153600000, 43000.25]],
        "market_caps": [],
        "total_volumes": []
    }"#;

    let series = parse_market_chart(body).unwrap();
    assert_eq!(series.len(), 3);

    let first = series.points()[0];
    assert_eq!(first.timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    assert_eq!(first.price, 42000.5);
    assert!(series
        .points()
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[rstest]
#[case::missing_prices(r#"{"market_caps": []}"#)]
#[case::pairs_not_arrays(r#"{"prices": [{"t": 1, "p": 2}]}"#)]
#[case::short_pairs(r#"{"prices": [[1704067200000]]}"#)]
#[case::not_json("<html>rate limited</html>")]
#[case::out_of_order(r#"{"prices": [[1704070800000, 1.0], [1704067200000, 2.0]]}"#)]
fn test_parse_market_chart_rejects(#[case] body: &str) {
    assert!(matches!(
        parse_market_chart(body),
        Err(ForecastError::DataFormatError(_))
    ));
}

#[test]
fn test_empty_price_array_is_an_empty_series() {
    let series = parse_market_chart(r#"{"prices": []}"#).unwrap();
    assert!(series.is_empty());
}

#[test]
fn test_unreachable_endpoint_is_a_network_error() {
    let client = CoinGeckoClient::with_base_url("http://127.0.0.1:9/api/v3").unwrap();
    let result = client.fetch_price_history("bitcoin", "usd", 30);
    assert!(matches!(result, Err(ForecastError::NetworkError(_))));
}

#[test]
fn test_csv_source_replays_saved_series() {
    let dir = tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());
    let series = price_series(&[10.0, 11.5, 12.25], 8);
    store.save_price_series("bitcoin", &series).unwrap();

    let source = CsvPriceSource::new(store.price_series_path("bitcoin"));
    let replayed = source.fetch_price_history("bitcoin", "usd", 365).unwrap();
    assert_eq!(replayed, series);
}

use clap::Parser;
use crypto_forecast::cli::Cli;
use crypto_forecast::config::PipelineConfig;
use crypto_forecast::error::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_defaults_match_standard_run() {
    let config = PipelineConfig::default();

    assert_eq!(config.asset, "bitcoin");
    assert_eq!(config.vs_currency, "usd");
    assert_eq!(config.days, 365);
    assert_eq!(config.train_ratio, 0.8);
    assert_eq!(config.seasonal_period, 30);
    assert_eq!((config.short_window, config.long_window), (7, 30));
    assert_eq!(config.arima_order, (5, 1, 0));
    assert!(config.prophet_daily_seasonality);
    assert_eq!(config.output_dir, PathBuf::from("."));
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_json_is_default() {
    assert_eq!(
        PipelineConfig::from_json_str("{}").unwrap(),
        PipelineConfig::default()
    );
}

#[test]
fn test_json_round_trip() {
    let config = PipelineConfig {
        asset: "solana".to_string(),
        days: 90,
        arima_order: (3, 1, 0),
        ..PipelineConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_malformed_json_is_a_config_error() {
    assert!(matches!(
        PipelineConfig::from_json_str(r#"{"days": "many"}"#),
        Err(ForecastError::ConfigError(_))
    ));
    assert!(matches!(
        PipelineConfig::from_json_file("does/not/exist.json"),
        Err(ForecastError::ConfigError(_))
    ));
}

#[rstest]
#[case::empty_asset(PipelineConfig { asset: " ".to_string(), ..PipelineConfig::default() })]
#[case::empty_currency(PipelineConfig { vs_currency: String::new(), ..PipelineConfig::default() })]
#[case::zero_days(PipelineConfig { days: 0, ..PipelineConfig::default() })]
#[case::ratio_zero(PipelineConfig { train_ratio: 0.0, ..PipelineConfig::default() })]
#[case::ratio_one(PipelineConfig { train_ratio: 1.0, ..PipelineConfig::default() })]
#[case::period_one(PipelineConfig { seasonal_period: 1, ..PipelineConfig::default() })]
#[case::zero_short_window(PipelineConfig { short_window: 0, ..PipelineConfig::default() })]
#[case::zero_long_window(PipelineConfig { long_window: 0, ..PipelineConfig::default() })]
#[case::ma_terms(PipelineConfig { arima_order: (5, 1, 2), ..PipelineConfig::default() })]
fn test_invalid_configs_rejected(#[case] config: PipelineConfig) {
    assert!(matches!(config.validate(), Err(ForecastError::ConfigError(_))));
}

#[test]
fn test_cli_without_flags_is_standard_run() {
    let cli = Cli::parse_from(["crypto_forecast"]);
    assert!(!cli.offline);
    assert_eq!(cli.resolve_config().unwrap(), PipelineConfig::default());
}

#[test]
fn test_cli_flags_override_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"asset": "ethereum", "days": 120, "seasonal_period": 7}}"#).unwrap();

    let cli = Cli::parse_from([
        "crypto_forecast",
        "--config",
        file.path().to_str().unwrap(),
        "--days",
        "200",
        "--currency",
        "eur",
        "--output-dir",
        "out",
    ]);
    let config = cli.resolve_config().unwrap();

    assert_eq!(config.asset, "ethereum");
    assert_eq!(config.days, 200);
    assert_eq!(config.vs_currency, "eur");
    assert_eq!(config.seasonal_period, 7);
    assert_eq!(config.output_dir, PathBuf::from("out"));
}

#[test]
fn test_cli_rejects_invalid_override() {
    let cli = Cli::parse_from(["crypto_forecast", "--days", "0"]);
    assert!(matches!(
        cli.resolve_config(),
        Err(ForecastError::ConfigError(_))
    ));
}

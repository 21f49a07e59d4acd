mod common;

use approx::assert_relative_eq;
use chrono::Duration;
use common::{daily_series, start_date};
use crypto_forecast::error::ForecastError;
use crypto_forecast::metrics::{ensemble_mean, mean_absolute_error, MetricReport};
use crypto_forecast::models::ForecastResult;
use pretty_assertions::assert_eq;

fn forecast_from(offset: i64, values: Vec<f64>) -> ForecastResult {
    let dates = (0..values.len())
        .map(|i| start_date() + Duration::days(offset + i as i64))
        .collect();
    ForecastResult::new(values, dates).unwrap()
}

#[test]
fn test_mean_absolute_error() {
    let actual = daily_series(vec![100.0, 102.0, 104.0, 106.0]);
    let forecast = forecast_from(0, vec![101.0, 100.0, 104.0, 110.0]);

    let mae = mean_absolute_error(&forecast, &actual).unwrap();
    assert_relative_eq!(mae, (1.0 + 2.0 + 0.0 + 4.0) / 4.0);
}

#[test]
fn test_mae_requires_matching_length_and_dates() {
    let actual = daily_series(vec![1.0, 2.0, 3.0]);

    let short = forecast_from(0, vec![1.0, 2.0]);
    assert!(matches!(
        mean_absolute_error(&short, &actual),
        Err(ForecastError::AlignmentError(_))
    ));

    let shifted = forecast_from(1, vec![1.0, 2.0, 3.0]);
    assert!(matches!(
        mean_absolute_error(&shifted, &actual),
        Err(ForecastError::AlignmentError(_))
    ));
}

#[test]
fn test_ensemble_is_elementwise_mean() {
    let arima = forecast_from(0, vec![10.0, 20.0, 30.0]);
    let prophet = forecast_from(0, vec![12.0, 18.0, 33.0]);

    let ensemble = ensemble_mean(&[&arima, &prophet]).unwrap();
    assert_eq!(ensemble.dates(), arima.dates());
    for i in 0..3 {
        assert_relative_eq!(
            ensemble.values()[i],
            (arima.values()[i] + prophet.values()[i]) / 2.0
        );
    }
    assert!(ensemble.intervals().is_none());
}

#[test]
fn test_ensemble_rejects_mismatched_members() {
    let a = forecast_from(0, vec![1.0, 2.0]);
    let b = forecast_from(1, vec![1.0, 2.0]);
    let c = forecast_from(0, vec![1.0, 2.0, 3.0]);

    assert!(matches!(
        ensemble_mean(&[&a, &b]),
        Err(ForecastError::AlignmentError(_))
    ));
    assert!(matches!(
        ensemble_mean(&[&a, &c]),
        Err(ForecastError::AlignmentError(_))
    ));
    assert!(matches!(
        ensemble_mean(&[]),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_metric_report_line() {
    assert_eq!(
        MetricReport::mae("ARIMA", 12.5).to_string(),
        "ARIMA MAE: 12.5\n"
    );
    assert_eq!(
        MetricReport::mae("Prophet", 3.0).to_string(),
        "Prophet MAE: 3\n"
    );
}

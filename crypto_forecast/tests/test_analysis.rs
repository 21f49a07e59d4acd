mod common;

use approx::assert_relative_eq;
use common::{daily_series, trend_with_weekly_cycle};
use crypto_forecast::analysis::analyze;
use crypto_forecast::config::PipelineConfig;
use crypto_forecast::error::ForecastError;
use rstest::rstest;

#[rstest]
#[case(10)]
#[case(59)]
fn test_short_series_fails_decomposition(#[case] n: usize) {
    let series = daily_series(trend_with_weekly_cycle(n));
    let result = analyze(&series, &PipelineConfig::default());
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_two_full_periods_are_enough() {
    let series = daily_series(trend_with_weekly_cycle(60));
    let analysis = analyze(&series, &PipelineConfig::default()).unwrap();
    assert_eq!(analysis.decomposition.trend.len(), 60);
}

#[test]
fn test_non_positive_prices_rejected() {
    let mut values = trend_with_weekly_cycle(90);
    values[40] = -1.0;
    let result = analyze(&daily_series(values), &PipelineConfig::default());
    assert!(matches!(result, Err(ForecastError::DataFormatError(_))));
}

#[test]
fn test_decomposition_reconstructs_interior() {
    let values = trend_with_weekly_cycle(100);
    let analysis = analyze(&daily_series(values.clone()), &PipelineConfig::default()).unwrap();
    let d = &analysis.decomposition;

    for i in 15..85 {
        assert_relative_eq!(
            d.trend[i] * d.seasonal[i] * d.residual[i],
            values[i],
            max_relative = 1e-10
        );
    }
    assert!(d.trend[0].is_nan() && d.trend[99].is_nan());
}

#[test]
fn test_weekly_period_recovers_linear_trend() {
    let config = PipelineConfig {
        seasonal_period: 7,
        ..PipelineConfig::default()
    };
    let analysis = analyze(&daily_series(trend_with_weekly_cycle(100)), &config).unwrap();
    let d = &analysis.decomposition;

    for i in 3..97 {
        assert_relative_eq!(d.trend[i], 100.0 + 0.5 * i as f64, epsilon = 1e-9);
        assert_relative_eq!(d.seasonal[i], d.seasonal[i % 7], epsilon = 1e-12);
    }
}

#[test]
fn test_moving_averages() {
    let values = trend_with_weekly_cycle(90);
    let analysis = analyze(&daily_series(values.clone()), &PipelineConfig::default()).unwrap();

    assert!(analysis.short_ma[..6].iter().all(|v| v.is_nan()));
    assert!(analysis.long_ma[..29].iter().all(|v| v.is_nan()));

    for i in 29..90 {
        let long: f64 = values[i + 1 - 30..=i].iter().sum::<f64>() / 30.0;
        assert_relative_eq!(analysis.long_ma[i], long, epsilon = 1e-9);
    }
    for i in 6..90 {
        let short: f64 = values[i + 1 - 7..=i].iter().sum::<f64>() / 7.0;
        assert_relative_eq!(analysis.short_ma[i], short, epsilon = 1e-9);
    }
}

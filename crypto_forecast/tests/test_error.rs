use crypto_forecast::error::ForecastError;
use std::collections::HashSet;
use std::io;
use trade_math::MathError;

#[test]
fn test_error_display() {
    let err = ForecastError::InsufficientData("need 60 days".to_string());
    assert_eq!(err.to_string(), "Insufficient data: need 60 days");

    let err = ForecastError::AlignmentError("dates differ".to_string());
    assert_eq!(err.to_string(), "Alignment error: dates differ");
}

#[test]
fn test_math_error_mapping() {
    let err: ForecastError = MathError::InsufficientData("short".to_string()).into();
    assert!(matches!(err, ForecastError::InsufficientData(_)));

    let err: ForecastError = MathError::InvalidInput("negative".to_string()).into();
    assert!(matches!(err, ForecastError::DataFormatError(_)));

    let err: ForecastError = MathError::CalculationError("singular".to_string()).into();
    assert!(matches!(err, ForecastError::ModelFitError(_)));
}

#[test]
fn test_io_and_json_conversions() {
    let err: ForecastError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
    assert!(matches!(err, ForecastError::IoError(_)));

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: ForecastError = json_err.into();
    assert!(matches!(err, ForecastError::DataFormatError(_)));
}

#[test]
fn test_pipeline_error_kinds_have_distinct_exit_codes() {
    let errors = [
        ForecastError::NetworkError(String::new()),
        ForecastError::DataFormatError(String::new()),
        ForecastError::InsufficientData(String::new()),
        ForecastError::ModelFitError(String::new()),
        ForecastError::AlignmentError(String::new()),
        ForecastError::ConfigError(String::new()),
        ForecastError::ChartError(String::new()),
    ];

    let codes: HashSet<u8> = errors.iter().map(|e| e.exit_code()).collect();
    assert_eq!(codes.len(), errors.len());
    assert!(!codes.contains(&0));
}

//! Price series handling: raw samples, daily resampling, splitting and CSV persistence

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Timestamp layout of the raw price CSV
pub const RAW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// Date layout of the daily price CSV
pub const DAILY_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single observed market sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Raw price history with strictly increasing timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a price series, rejecting out-of-order samples and non-finite prices
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if let Some(bad) = points.iter().find(|p| !p.price.is_finite()) {
            return Err(ForecastError::DataFormatError(format!(
                "Non-finite price {} at {}",
                bad.price, bad.timestamp
            )));
        }

        if let Some(pair) = points.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(ForecastError::DataFormatError(format!(
                "Timestamps must be strictly increasing: {} is followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }

        Ok(Self { points })
    }

    /// Build a series from `[millis, price]` pairs as returned by market-chart endpoints
    pub fn from_millis_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let mut points = Vec::with_capacity(pairs.len());
        for &(millis, price) in pairs {
            if !millis.is_finite() {
                return Err(ForecastError::DataFormatError(format!(
                    "Invalid timestamp {}",
                    millis
                )));
            }
            let timestamp = Utc
                .timestamp_millis_opt(millis as i64)
                .single()
                .ok_or_else(|| {
                    ForecastError::DataFormatError(format!("Timestamp out of range: {}", millis))
                })?;
            points.push(PricePoint { timestamp, price });
        }
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Exactly one value per consecutive calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DailySeries {
    /// Create a daily series; dates must be consecutive calendar days
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::DataFormatError(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }

        if let Some(pair) = dates
            .windows(2)
            .find(|w| w[1] - w[0] != Duration::days(1))
        {
            return Err(ForecastError::DataFormatError(format!(
                "Daily series must have consecutive dates: {} is followed by {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self { dates, values })
    }

    /// Create a series of `values` on consecutive days starting at `start`
    pub fn from_start(start: NaiveDate, values: Vec<f64>) -> Self {
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        Self { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Get the contiguous sub-series `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Slice {}..{} out of bounds for series of length {}",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Split into a training prefix of `floor(train_ratio * n)` days and the test suffix
    pub fn split(&self, train_ratio: f64) -> Result<TrainTestSplit> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Train ratio must be between 0 and 1, got {}",
                train_ratio
            )));
        }

        let train_size = (self.len() as f64 * train_ratio).floor() as usize;
        if train_size == 0 || train_size == self.len() {
            return Err(ForecastError::InsufficientData(format!(
                "Cannot split {} days at ratio {} into non-empty train and test sets",
                self.len(),
                train_ratio
            )));
        }

        Ok(TrainTestSplit {
            train: self.slice(0, train_size)?,
            test: self.slice(train_size, self.len())?,
        })
    }
}

/// Contiguous, non-overlapping train prefix and test suffix
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: DailySeries,
    pub test: DailySeries,
}

/// Resample to one value per UTC calendar day
///
/// Each day holds the mean of its observations; days without observations
/// carry the previous day's value forward. The range runs from the first to
/// the last observed day, so the first bucket is always observed.
pub fn resample_daily(series: &PriceSeries) -> Result<DailySeries> {
    let (first, last) = match (series.points.first(), series.points.last()) {
        (Some(first), Some(last)) => (first.timestamp.date_naive(), last.timestamp.date_naive()),
        _ => {
            return Err(ForecastError::InsufficientData(
                "Cannot resample an empty price series".to_string(),
            ))
        }
    };

    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for point in &series.points {
        let entry = buckets
            .entry(point.timestamp.date_naive())
            .or_insert((0.0, 0));
        entry.0 += point.price;
        entry.1 += 1;
    }

    let days = (last - first).num_days() as usize + 1;
    let mut dates = Vec::with_capacity(days);
    let mut values = Vec::with_capacity(days);
    let mut filled = 0usize;
    let mut carried = f64::NAN;

    for offset in 0..days {
        let date = first + Duration::days(offset as i64);
        match buckets.get(&date) {
            Some(&(sum, count)) => carried = sum / count as f64,
            None => filled += 1,
        }
        dates.push(date);
        values.push(carried);
    }

    if filled > 0 {
        warn!(filled, days, "Forward-filled days without observations");
    }
    debug!(samples = series.len(), days, "Resampled price series to daily frequency");

    DailySeries::new(dates, values)
}

/// Data loader for persisted price series
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a raw price series from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
        let file = File::open(path)?;
        read_price_csv(file)
    }

    /// Load a daily series from a CSV file
    pub fn daily_from_csv<P: AsRef<Path>>(path: P) -> Result<DailySeries> {
        let file = File::open(path)?;
        read_daily_csv(file)
    }
}

/// Write a raw price series as `timestamp,price`
pub fn write_price_csv<W: Write>(series: &PriceSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["timestamp", "price"])?;
    for point in &series.points {
        wtr.write_record([
            point.timestamp.format(RAW_TIMESTAMP_FORMAT).to_string(),
            point.price.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a daily series as `timestamp,price`
pub fn write_daily_csv<W: Write>(series: &DailySeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["timestamp", "price"])?;
    for (date, value) in series.dates.iter().zip(series.values.iter()) {
        wtr.write_record([
            date.format(DAILY_DATE_FORMAT).to_string(),
            value.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a raw price series written by [`write_price_csv`]
///
/// Plain dates and whole-second timestamps are accepted as well.
pub fn read_price_csv<R: Read>(reader: R) -> Result<PriceSeries> {
    let mut points = Vec::new();
    for (timestamp, price) in read_rows(reader)? {
        points.push(PricePoint {
            timestamp: parse_timestamp(&timestamp)?,
            price,
        });
    }
    PriceSeries::new(points)
}

/// Read a daily series written by [`write_daily_csv`]
pub fn read_daily_csv<R: Read>(reader: R) -> Result<DailySeries> {
    let mut dates = Vec::new();
    let mut values = Vec::new();
    for (timestamp, price) in read_rows(reader)? {
        dates.push(parse_timestamp(&timestamp)?.date_naive());
        values.push(price);
    }
    DailySeries::new(dates, values)
}

fn read_rows<R: Read>(reader: R) -> Result<Vec<(String, f64)>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (ts_idx, price_idx) = match (column("timestamp"), column("price")) {
        (Some(ts), Some(price)) => (ts, price),
        _ => {
            return Err(ForecastError::DataFormatError(format!(
                "Expected 'timestamp' and 'price' columns, found {:?}",
                headers.iter().collect::<Vec<_>>()
            )))
        }
    };

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let timestamp = record.get(ts_idx).unwrap_or_default().trim().to_string();
        let raw_price = record.get(price_idx).unwrap_or_default().trim();
        let price = if raw_price.is_empty() {
            f64::NAN
        } else {
            raw_price.parse::<f64>().map_err(|e| {
                ForecastError::DataFormatError(format!("Invalid price '{}': {}", raw_price, e))
            })?
        };
        rows.push((timestamp, price));
    }

    Ok(rows)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    for format in [RAW_TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, DAILY_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ForecastError::DataFormatError(format!("Invalid timestamp '{}'", raw)))
}

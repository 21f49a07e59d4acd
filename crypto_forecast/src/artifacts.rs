//! Artifact persistence
//!
//! The pipeline hands every artifact to an [`ArtifactStore`];
//! [`FileArtifactStore`] lays them out on disk as
//!
//! ```text
//! <root>/data/<asset>_prices.csv
//! <root>/data/daily_<asset>_prices.csv
//! <root>/plots/<chart>.png
//! <root>/results/<metric>.txt
//! ```

use crate::charts::Chart;
use crate::data::{write_daily_csv, write_price_csv, DailySeries, PriceSeries};
use crate::error::Result;
use crate::metrics::MetricReport;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sink for everything a run produces
pub trait ArtifactStore {
    /// Persist the raw fetched series
    fn save_price_series(&self, asset: &str, series: &PriceSeries) -> Result<()>;

    /// Persist the resampled daily series
    fn save_daily_series(&self, asset: &str, series: &DailySeries) -> Result<()>;

    /// Persist a chart under `name`
    fn save_chart(&self, name: &str, chart: &Chart) -> Result<()>;

    /// Persist a scalar metric under `name`
    fn save_metric(&self, name: &str, report: &MetricReport) -> Result<()>;
}

/// Writes artifacts below a root directory, creating subdirectories as needed
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn price_series_path(&self, asset: &str) -> PathBuf {
        self.root.join("data").join(format!("{}_prices.csv", asset))
    }

    pub fn daily_series_path(&self, asset: &str) -> PathBuf {
        self.root
            .join("data")
            .join(format!("daily_{}_prices.csv", asset))
    }

    pub fn chart_path(&self, name: &str) -> PathBuf {
        self.root.join("plots").join(format!("{}.png", name))
    }

    pub fn metric_path(&self, name: &str) -> PathBuf {
        self.root.join("results").join(format!("{}.txt", name))
    }

    fn create(&self, path: &Path) -> Result<BufWriter<File>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(BufWriter::new(File::create(path)?))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save_price_series(&self, asset: &str, series: &PriceSeries) -> Result<()> {
        let path = self.price_series_path(asset);
        write_price_csv(series, self.create(&path)?)?;
        info!(path = %path.display(), rows = series.len(), "Saved raw price series");
        Ok(())
    }

    fn save_daily_series(&self, asset: &str, series: &DailySeries) -> Result<()> {
        let path = self.daily_series_path(asset);
        write_daily_csv(series, self.create(&path)?)?;
        info!(path = %path.display(), rows = series.len(), "Saved daily price series");
        Ok(())
    }

    fn save_chart(&self, name: &str, chart: &Chart) -> Result<()> {
        let path = self.chart_path(name);
        let bytes = chart.render_png()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        info!(path = %path.display(), title = %chart.title, "Saved chart");
        Ok(())
    }

    fn save_metric(&self, name: &str, report: &MetricReport) -> Result<()> {
        let path = self.metric_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, report.to_string())?;
        info!(path = %path.display(), value = report.value, "Saved metric");
        Ok(())
    }
}

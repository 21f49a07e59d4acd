//! CLI definition and dispatch

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::artifacts::FileArtifactStore;
use crate::config::PipelineConfig;
use crate::error::{ForecastError, Result};
use crate::market::{CoinGeckoClient, CsvPriceSource, MarketDataSource};
use crate::pipeline::{Pipeline, RunReport};

#[derive(Parser, Debug)]
#[command(
    name = "crypto_forecast",
    version,
    about = "Fetch, decompose and forecast a daily cryptocurrency price series"
)]
pub struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Asset id on the market-data provider
    #[arg(long)]
    pub asset: Option<String>,
    /// Quote currency
    #[arg(long)]
    pub currency: Option<String>,
    /// Lookback window in days
    #[arg(long)]
    pub days: Option<u32>,
    /// Root directory for data/, plots/ and results/
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Re-use the raw price CSV of a previous run instead of fetching
    #[arg(long)]
    pub offline: bool,
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Configuration file (or defaults) with the command-line overrides applied
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(asset) = &self.asset {
            config.asset = asset.clone();
        }
        if let Some(currency) = &self.currency {
            config.vs_currency = currency.clone();
        }
        if let Some(days) = self.days {
            config.days = days;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(report) => {
            println!("ARIMA MAE: {}", report.arima_mae);
            println!("Prophet MAE: {}", report.prophet_mae);
            println!("Ensemble MAE: {}", report.ensemble_mae);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "Run failed");
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

fn execute(cli: &Cli) -> Result<RunReport> {
    let config = cli.resolve_config()?;
    let store = FileArtifactStore::new(config.output_dir.clone());

    let source: Box<dyn MarketDataSource> = if cli.offline {
        let path = store.price_series_path(&config.asset);
        if !path.exists() {
            return Err(ForecastError::ConfigError(format!(
                "--offline needs {} from an earlier run",
                path.display()
            )));
        }
        Box::new(CsvPriceSource::new(path))
    } else {
        Box::new(CoinGeckoClient::new()?)
    };

    info!(
        asset = %config.asset,
        output_dir = %config.output_dir.display(),
        offline = cli.offline,
        "Starting run"
    );
    Pipeline::new(config, source.as_ref(), &store)?.run()
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialisation (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

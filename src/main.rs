use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use intero_experiment::ExperimentConfig;
use intero_scoring::ReferenceDataset;
use log::{debug, warn};

mod app;
mod console;

use app::App;

#[derive(Parser)]
#[command(
    name = "interoception-experiment",
    version,
    about = "Heartbeat counting task scored against a live ECG stream"
)]
struct Cli {
    /// JSON experiment config; defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the accuracy_awareness_*.csv and accuracy_confidence_*.csv files
    #[arg(long, env = "INTERO_REFERENCE_DIR")]
    reference_dir: Option<PathBuf>,

    /// Where session records are written
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seed for trial order and the simulated sensor
    #[arg(long)]
    seed: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.reference_dir {
        config.reference_dir = Some(dir);
    }
    config
        .validate()
        .context("invalid experiment configuration")?;
    debug!("config: {}", serde_json::to_string(&config)?);

    let reference = config
        .reference_dir
        .as_ref()
        .map(|dir| ReferenceDataset::load(dir).map(Arc::new))
        .transpose()
        .context("failed to load reference data")?;
    if reference.is_none() {
        warn!("no reference directory configured; percentile ranks will be absent");
    }

    App::new(config, reference, cli.seed).run()
}

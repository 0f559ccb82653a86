//! Churn pipeline trainer CLI
//!
//! Deterministic offline trainer producing one reproducible pipeline artifact.

use anyhow::{Context, Result};
use churn_core::ChurnConfig;
use churn_trainer::{fit, preprocess, train, TrainReport};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "churn-train")]
#[command(author = "Churn Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic churn pipeline trainer", long_about = None)]
struct Args {
    /// Configuration file (TOML); also read from CHURN_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raw CSV source
    #[arg(long, global = true)]
    raw_csv: Option<PathBuf>,

    /// Output path of the trained pipeline artifact
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Share of rows held out for evaluation (0 disables)
    #[arg(long, global = true)]
    holdout_fraction: Option<f64>,

    /// Seed for the holdout split
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Load, clean, fit transform and scorer, persist one pipeline (default)
    Fit,
    /// Fit the transform only and persist it with the encoded matrix and labels
    Preprocess,
    /// Wait for preprocess outputs, fit the scorer and persist the pipeline
    Train,
}

impl Args {
    fn apply_overrides(&self, config: &mut ChurnConfig) {
        if let Some(path) = &self.raw_csv {
            config.raw_csv = path.clone();
        }
        if let Some(path) = &self.model_path {
            config.model_path = path.clone();
        }
        if let Some(fraction) = self.holdout_fraction {
            config.holdout_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
    }
}

fn init_logging(config: &ChurnConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to set tracing subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
            .context("Failed to set tracing subscriber")?;
    }

    Ok(())
}

fn log_report(report: &TrainReport) {
    info!("✓ Training completed successfully");
    info!("  Model: {}", report.model_path.display());
    info!("  Hash: {}", report.digest);
    info!("  Training rows: {}", report.training_rows);
    info!("  Output features: {}", report.output_width);
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        ChurnConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    init_logging(&config)?;

    info!("Churn Trainer v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Fit) {
        Command::Fit => {
            let report = fit(&config).context("End-to-end training failed")?;
            log_report(&report);
        }
        Command::Preprocess => {
            let report = preprocess(&config).context("Preprocessing failed")?;
            info!("✓ Preprocessing completed successfully");
            info!("  Rows: {}, features: {}", report.rows, report.output_width);
        }
        Command::Train => {
            let report = train(&config).context("Training failed")?;
            log_report(&report);
        }
    }

    Ok(())
}

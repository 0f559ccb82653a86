//! Churn prediction service
//!
//! Binds the HTTP listener first, then loads the trained pipeline on a
//! blocking task. Until the load completes `/predict` answers 503; a failed
//! load terminates the process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use churn_core::{ChurnConfig, TrainedPipeline};
use churn_serve::{bind_listener, build_router, telemetry, AppState, PipelineHandle};
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "churn-serve")]
#[command(author = "Churn Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Churn prediction HTTP service", long_about = None)]
struct Args {
    /// Configuration file (TOML); also read from CHURN_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trained pipeline artifact to serve
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Log format: pretty or json
    #[arg(long)]
    log_format: Option<String>,

    /// Disable the Prometheus exporter
    #[arg(long)]
    no_metrics: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut ChurnConfig) {
        if let Some(path) = &self.model_path {
            config.model_path = path.clone();
        }
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if self.no_metrics {
            config.prometheus_enabled = false;
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
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("Failed to set tracing subscriber")?;
    }

    Ok(())
}

fn init_metrics(config: &ChurnConfig) -> Option<PrometheusHandle> {
    if !config.prometheus_enabled {
        info!("Prometheus metrics exporter disabled via configuration");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics exporter registered");
            telemetry::describe();
            Some(handle)
        }
        Err(err) => {
            warn!("Failed to install Prometheus metrics exporter: {}", err);
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn load_pipeline(handle: PipelineHandle, path: PathBuf) -> Result<()> {
    info!("Loading trained pipeline from {}", path.display());
    let display = path.display().to_string();
    let pipeline = tokio::task::spawn_blocking(move || TrainedPipeline::load(&path))
        .await
        .context("Pipeline loader task failed")?
        .with_context(|| format!("Failed to load trained pipeline from {display}"))?;

    handle
        .install(pipeline)
        .map_err(|_| anyhow!("pipeline handle was already initialised"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        ChurnConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    init_logging(&config)?;

    info!("Churn Serve v{}", env!("CARGO_PKG_VERSION"));

    let prometheus = init_metrics(&config);
    let handle = PipelineHandle::new();
    let state = Arc::new(AppState::new(handle.clone(), prometheus));

    let listener = bind_listener(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    let server = async {
        axum::serve(listener, build_router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server terminated unexpectedly")
    };

    tokio::try_join!(server, load_pipeline(handle, config.model_path.clone()))?;
    Ok(())
}

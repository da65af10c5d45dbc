//! Shadow-traffic comparison proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                    HTTP SCIENCE                       │
//!                         │                                                       │
//!   Client Request        │  ┌─────────┐    ┌────────────┐    ┌─────────────┐    │
//!   ──────────────────────┼─▶│  http   │───▶│  dispatch  │───▶│  forward    │────┼──▶ Control
//!                         │  │ server  │    │ (capture)  │    │ (dial ×2)   │────┼──▶ Experiment
//!                         │  └────┬────┘    └─────┬──────┘    └──────┬──────┘    │
//!                         │       │               │                  │           │
//!   "OK" (always)         │       │               ▼                  ▼           │
//!   ◀─────────────────────┼───────┘         ┌──────────┐     ┌─────────────┐     │
//!                         │                 │  stats   │◀────│  compare    │     │
//!                         │                 │aggregator│     │strict / weak│     │
//!                         │                 └────┬─────┘     └─────────────┘     │
//!                         │                      ▼                               │
//!                         │                 diff log, admin API, metrics         │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use http_science::config::{read_config, validate_config, ConfigError, ScienceConfig};
use http_science::lifecycle::{trigger_on_ctrl_c, Shutdown};
use http_science::observability::{logging, metrics};
use http_science::stats::{open_sink, DiffAggregator};
use http_science::{CompareMode, ScienceServer};

#[derive(Parser)]
#[command(name = "http-science")]
#[command(about = "Forward traffic to a control and an experiment backend and log response diffs", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control backend (host:port or http:// URL).
    #[arg(long, env = "CONTROL")]
    control: Option<String>,

    /// Experiment backend (host:port or http:// URL).
    #[arg(long, env = "EXPERIMENT")]
    experiment: Option<String>,

    /// Listen address.
    #[arg(short, long)]
    listen: Option<String>,

    /// Ignore JSON array order when comparing bodies.
    #[arg(long, env = "WEAK_COMPARE", value_parser = clap::builder::FalseyValueParser::new())]
    weak: bool,

    /// Append diff records to this file instead of stdout.
    #[arg(long)]
    diff_log: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<ScienceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ScienceConfig::default(),
        };

        if let Some(control) = self.control {
            config.backends.control = control;
        }
        if let Some(experiment) = self.experiment {
            config.backends.experiment = experiment;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if self.weak {
            config.comparison.mode = CompareMode::Weak;
        }
        if let Some(path) = self.diff_log {
            config.diff_log.path = Some(path);
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("http-science v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        control = %config.backends.control,
        experiment = %config.backends.experiment,
        mode = %config.comparison.mode,
        on_forward_error = ?config.dispatch.on_forward_error,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let aggregator = Arc::new(DiffAggregator::new(open_sink(&config.diff_log)?)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    trigger_on_ctrl_c(shutdown.clone());

    let server = ScienceServer::new(config, aggregator.clone())?;
    server.run(listener, shutdown.subscribe()).await?;

    aggregator.flush().await;
    let stats = aggregator.snapshot();
    tracing::info!(
        total_requests = stats.total_requests,
        total_diffs = stats.total_diffs,
        "Shutdown complete"
    );
    Ok(())
}

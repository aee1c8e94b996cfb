//! # Console Gateway Main Entry Point
//!
//! Loads layered configuration, initializes tracing and serves the gateway.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console_gateway::{config::ConfigLoader, server::run_server, telemetry};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "console-gateway", version, about = "Admin console gateway")]
struct Cli {
    /// Directory holding the layered `.env` files
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Load and validate configuration, print it redacted, then exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match cli.config_dir {
        Some(dir) => ConfigLoader::with_base_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("loading configuration")?;

    if cli.check_config {
        println!("{}", config.redacted_json().context("rendering configuration")?);
        return Ok(());
    }

    telemetry::init_tracing(&config).context("initializing tracing")?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(configuration = %redacted_json, "Effective configuration");
    }

    run_server(config).await.context("running server")
}

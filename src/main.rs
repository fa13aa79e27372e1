//! srm-analyze - Submit sources, binaries and tool outputs to Software Risk Manager

use std::io::IsTerminal;

use clap::Parser;
use log::{LevelFilter, debug};

mod cli;
mod client;
mod config;
mod error;
mod orchestrator;
mod output;
mod packaging;
mod resolve;

use cli::{Cli, OutputFormat};
use client::SrmClient;
use config::{AnalysisConfig, ConfigLayer};
use error::Result;
use orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    tokio::select! {
        result = run(cli) => {
            if let Err(err) = result {
                eprintln!("Error: {}", err);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Error: interrupted");
            std::process::exit(130);
        }
    }
}

/// `RUST_LOG` wins over the level chosen by `--debug`
fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let file_layer = match cli.config {
        Some(ref path) => {
            debug!("Loading configuration from {}", path.display());
            ConfigLayer::load_from(path)?
        }
        None => ConfigLayer::default(),
    };
    let config = AnalysisConfig::from_layer(cli.to_layer().or(file_layer))?;

    let client = SrmClient::new(
        &config.server_url,
        &config.api_key,
        config.ca_cert_pem.as_deref(),
    )?;

    let mut orchestrator = Orchestrator::new(&config, &client);
    if cli.format == OutputFormat::Pretty && std::io::stderr().is_terminal() {
        orchestrator = orchestrator.with_spinner();
    }

    let summary = orchestrator.run().await?;
    output::print(&summary, cli.format)
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

mod api;
mod config;
mod logging;
mod node;
mod scheduler;

use config::NodeConfig;
use node::CampaignNode;

#[derive(Parser)]
#[command(name = "pointpool")]
#[command(about = "Swap campaign reward node", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the campaign node
    Start {
        /// Override the API port from the config file
        #[arg(long)]
        api_port: Option<u16>,
    },
    /// Write a default configuration file
    Init {
        /// Where to write the config
        #[arg(short, long, default_value = "pointpool.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Init { output } => {
            let config = NodeConfig::default();
            config.save_to_file(&output)?;
            info!("Wrote default config to {}", output.display());
            Ok(())
        }
        Commands::Start { api_port } => {
            let mut config = match &cli.config {
                Some(path) => NodeConfig::from_file(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => {
                    let mut config = NodeConfig::default();
                    config.apply_env_overrides();
                    config
                }
            };
            if let Some(port) = api_port {
                config.api.port = port;
            }
            run(config).await
        }
    }
}

async fn run(config: NodeConfig) -> Result<()> {
    info!(node_name = %config.node.name, "Starting campaign node");

    let node = CampaignNode::new(config.clone());

    let _settlement_jobs = scheduler::spawn_campaign_jobs(
        node.engine.clone(),
        config.campaign.start_time,
        config.campaign.weeks,
    );

    let api_handle = if config.api.enabled {
        Some(api::start_api_server(
            node.clone(),
            config.api.host.clone(),
            config.api.port,
        ))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping campaign node");

    if let Some(handle) = api_handle {
        handle.abort();
    }

    Ok(())
}

//! corvid agent - event-dispatch core for a chat bot
//!
//! Consumes inbound gateway events, gates them, runs configured triggers
//! and admin commands, and emits side-effect intents for the gateway to
//! execute.

mod acquire;
mod admin;
mod agent;
mod config;
mod gate;
mod matcher;
mod processor;
mod reactions;
mod stats;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corvid_store::StoreRegistry;

use crate::agent::Agent;
use crate::config::Config;
use crate::processor::EventProcessor;

/// corvid agent CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file (falls back to environment variables)
    #[arg(long, env = "CORVID_CONFIG")]
    config: Option<String>,

    /// Command prefix override
    #[arg(long)]
    prefix: Option<String>,

    /// Data directory override
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corvid_agent=debug,corvid_store=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(prefix) = args.prefix {
        config.prefix = prefix;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    info!("Prefix: {}", config.prefix);
    info!("Data directory: {}", config.data_dir);

    let registry = StoreRegistry::new(&config.data_dir);
    let processor = EventProcessor::new(config.prefix.as_str(), config.owner_id, &registry).await?;

    info!("Stores loaded, starting event processing...");

    Agent::new(processor).run().await
}

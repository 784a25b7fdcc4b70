//! HTTP server for the sakila question-answering API

use anyhow::Result;
use clap::Parser;
use sakila_ask::config::{AppConfig, ServerConfig};
use sakila_ask::pipeline::build_assistant;
use sakila_ask::server::{start_server, ApiState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve POST /ask over HTTP")]
struct Args {
    #[command(flatten)]
    config: AppConfig,

    #[command(flatten)]
    server: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let (assistant, model) = build_assistant(&args.config)?;

    info!("Loading model {}", args.config.model.model);
    if let Err(e) = model.init().await {
        warn!("Model not ready yet, will retry on first request: {}", e);
    }

    let state = ApiState {
        assistant: Arc::new(assistant),
        model: model.clone(),
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
    };
    start_server(&args.server, state, shutdown).await?;

    model.shutdown();
    info!("Server stopped");
    Ok(())
}

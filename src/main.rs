use anyhow::Result;
use clap::Parser;
use sakila_ask::config::AppConfig;
use sakila_ask::console::run_console;
use sakila_ask::pipeline::build_assistant;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sakila-ask")]
#[command(about = "Ask questions about the sakila database in plain language")]
struct Args {
    #[command(flatten)]
    config: AppConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (assistant, model) = build_assistant(&args.config)?;

    info!("Loading model {}", args.config.model.model);
    if let Err(e) = model.init().await {
        // Lazy initialization retries on the first question.
        warn!("Model not ready yet: {}", e);
    }

    run_console(&assistant, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    model.shutdown();
    Ok(())
}

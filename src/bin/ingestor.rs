//! Feed ingestor: streams live trades for one product into the Trade Store.
//!
//! Reconnects forever; stop with Ctrl+C.

use anyhow::{Context, Result};
use blink::application::system::Application;
use blink::config::Config;
use blink::infrastructure::observability::init_tracing;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Live trade feed ingestor", long_about = None)]
struct Cli {
    /// Product to subscribe to; overrides PAIR
    #[arg(long)]
    pair: Option<String>,

    /// Feed WebSocket URL; overrides FEED_WS_URL
    #[arg(long)]
    ws_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(pair) = cli.pair {
        config.pair = pair;
    }
    if let Some(ws_url) = cli.ws_url {
        config.feed.ws_url = ws_url;
    }

    init_tracing(&config.observability)?;
    info!("Ingestor starting for {}", config.pair);

    let app = Application::build(config).await?;
    let (task, state) = app.spawn_feed();

    tokio::signal::ctrl_c().await?;
    info!(
        feed_state = ?*state.borrow(),
        "Shutdown signal received. Exiting..."
    );
    task.abort();
    app.close().await;
    Ok(())
}

//! Blink - live trade feed anomaly scoring
//!
//! Runs the whole pipeline in one process: ingestion (live feed or replay),
//! the feature materializer and the HTTP API.
//!
//! # Usage
//! ```sh
//! PAIR=BTC-USD MODEL_NAME=blink_iforest MODEL_STORE_URI=./models \
//! DATABASE_URL=sqlite://data/blink.db cargo run --bin blink
//! ```

use anyhow::{Context, Result};
use blink::application::system::Application;
use blink::config::Config;
use blink::domain::types::SourceMode;
use blink::infrastructure::observability::init_tracing;
use clap::Parser;
use std::str::FromStr;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about = "Live trade anomaly scoring service", long_about = None)]
struct Cli {
    /// Ingestion mode (live, replay); overrides INGEST_MODE
    #[arg(long)]
    mode: Option<String>,

    /// HTTP listen address; overrides HTTP_BIND
    #[arg(long)]
    bind: Option<String>,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received. Exiting..."),
        Err(e) => error!("Unable to listen for shutdown signal: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(mode) = cli.mode.as_deref() {
        config.mode = SourceMode::from_str(mode)?;
    }
    if let Some(bind) = cli.bind {
        config.observability.http_bind = bind;
    }

    init_tracing(&config.observability)?;
    info!("Blink {} starting...", env!("CARGO_PKG_VERSION"));

    let bind = config.observability.http_bind.clone();
    let app = Application::build(config).await?;
    let handle = app.start();

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on {}", bind);

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    handle.shutdown();
    app.close().await;
    Ok(())
}

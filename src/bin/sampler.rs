//! Sampler: backfills the Trade Store from a historical trades CSV, then exits.

use anyhow::{Context, Result};
use blink::application::system::Application;
use blink::config::Config;
use blink::infrastructure::observability::init_tracing;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Replay a trades CSV into the Trade Store", long_about = None)]
struct Cli {
    /// CSV to replay; overrides SAMPLE_SOURCE
    #[arg(short, long)]
    source: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(&config.observability)?;
    info!("sampler starting");

    let source = cli
        .source
        .unwrap_or_else(|| config.sampler.source_path.clone());

    let app = Application::build(config).await?;
    let summary = app.run_replay(&source).await;
    app.close().await;
    let summary = summary?;

    info!(
        rows = summary.rows,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        failed = summary.failed,
        "sampler finished"
    );
    Ok(())
}

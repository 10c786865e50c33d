//! Replay Connector: backfills the Trade Store from a historical CSV.

use crate::config::SamplerEnvConfig;
use crate::domain::errors::TradeParseError;
use crate::domain::repositories::TradeRepository;
use crate::domain::types::Trade;
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const METRIC_SOURCE: &str = "replay";

/// Parsed replay rows, ascending by timestamp.
#[derive(Debug, Clone, Default)]
pub struct ReplayBatch {
    pub trades: Vec<Trade>,
    /// Rows dropped for an unparsable timestamp or price
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub rows: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Parse a replay timestamp: epoch seconds when `unix`, otherwise a calendar
/// string. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str, unix: bool) -> Result<DateTime<Utc>, TradeParseError> {
    let raw = raw.trim();
    let invalid = || TradeParseError::InvalidTimestamp {
        value: raw.to_string(),
    };

    if unix {
        let secs: f64 = raw.parse().map_err(|_| invalid())?;
        if !secs.is_finite() {
            return Err(invalid());
        }
        return DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
            .ok_or_else(invalid);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(ts) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(ts.and_utc());
    }
    Err(invalid())
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    match headers.iter().position(|h| h.trim() == name) {
        Some(idx) => Ok(idx),
        None => bail!("Column '{}' not found in {}", name, path.display()),
    }
}

/// Read and clean a replay CSV. A missing file or column is an error; bad rows are dropped.
pub fn load_replay_trades(path: &Path, config: &SamplerEnvConfig) -> Result<ReplayBatch> {
    let file = File::open(path)
        .with_context(|| format!("SAMPLE_SOURCE not found: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read CSV header of {}", path.display()))?
        .clone();
    let ts_idx = column_index(&headers, &config.ts_column, path)?;
    let price_idx = column_index(&headers, &config.price_column, path)?;
    let size_idx = match &config.size_column {
        Some(name) => Some(column_index(&headers, name, path)?),
        None => None,
    };

    let mut batch = ReplayBatch::default();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!(line, "Dropping unreadable CSV row: {}", e);
                batch.dropped += 1;
                continue;
            }
        };

        let timestamp = match record
            .get(ts_idx)
            .ok_or(TradeParseError::MissingField { field: "ts" })
            .and_then(|raw| parse_timestamp(raw, config.time_is_unix))
        {
            Ok(ts) => ts,
            Err(e) => {
                debug!(line, "Dropping row: {}", e);
                batch.dropped += 1;
                continue;
            }
        };

        let price = match record.get(price_idx).map(|raw| raw.trim().parse::<f64>()) {
            Some(Ok(p)) if p.is_finite() => p,
            _ => {
                debug!(line, "Dropping row with invalid price");
                batch.dropped += 1;
                continue;
            }
        };

        let size = size_idx
            .and_then(|idx| record.get(idx))
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite())
            .unwrap_or(config.size_default);

        batch.trades.push(Trade::new(timestamp, price, size));
    }

    // Stable: equal timestamps keep file order, so the first one wins on insert
    batch.trades.sort_by_key(|t| t.timestamp);

    if batch.dropped > 0 {
        warn!(
            dropped = batch.dropped,
            "Dropped unparsable rows from {}",
            path.display()
        );
    }
    Ok(batch)
}

/// Streams a parsed batch into the Trade Store, sequentially.
pub struct ReplayConnector {
    repository: Arc<dyn TradeRepository>,
    metrics: Metrics,
    progress_every: usize,
}

impl ReplayConnector {
    pub fn new(repository: Arc<dyn TradeRepository>, metrics: Metrics, progress_every: usize) -> Self {
        Self {
            repository,
            metrics,
            progress_every: progress_every.max(1),
        }
    }

    pub async fn stream(&self, trades: &[Trade]) -> ReplaySummary {
        let mut summary = ReplaySummary::default();

        for trade in trades {
            match self.repository.insert(trade).await {
                Ok(true) => {
                    summary.inserted += 1;
                    self.metrics.inc_ingested(METRIC_SOURCE, "inserted");
                }
                Ok(false) => {
                    summary.duplicates += 1;
                    self.metrics.inc_ingested(METRIC_SOURCE, "duplicate");
                }
                Err(e) => {
                    summary.failed += 1;
                    self.metrics.inc_ingested(METRIC_SOURCE, "failed");
                    error!(ts = %trade.timestamp, "failed to write trade: {:#}", e);
                }
            }
            summary.rows += 1;

            if summary.rows % self.progress_every == 0 {
                info!(rows = summary.rows, last = %trade.timestamp.to_rfc3339(), "streamed");
            }
        }

        info!(
            total_rows = summary.rows,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            failed = summary.failed,
            "stream complete"
        );
        summary
    }

    /// Load the configured source and stream it.
    pub async fn run(&self, path: &Path, config: &SamplerEnvConfig) -> Result<ReplaySummary> {
        info!(path = %path.display(), "beginning read");

        let path_buf = path.to_path_buf();
        let config_owned = config.clone();
        let batch = tokio::task::spawn_blocking(move || load_replay_trades(&path_buf, &config_owned))
            .await
            .context("Replay reader task failed")??;

        match (batch.trades.first(), batch.trades.last()) {
            (Some(first), Some(last)) => info!(
                rows = batch.trades.len(),
                start = %first.timestamp.to_rfc3339(),
                end = %last.timestamp.to_rfc3339(),
                "ready"
            ),
            _ => warn!("Replay source {} has no usable rows", path.display()),
        }

        Ok(self.stream(&batch.trades).await)
    }
}

use crate::application::features::feature_engine::compute_features;
use crate::domain::ports::FeatureCache;
use crate::domain::repositories::TradeRepository;
use crate::domain::types::{FeatureVector, SourceMode};
use crate::infrastructure::observability::Metrics;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MaterializerConfig {
    /// Fewer rows than this and the cycle publishes nothing
    pub min_rows: usize,
    pub ttl: Duration,
    /// Trailing window read in live mode
    pub live_lookback: Duration,
    pub success_interval: Duration,
    pub retry_interval: Duration,
    /// Trailing window served by the demo endpoint
    pub demo_window: Duration,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            min_rows: 90,
            ttl: Duration::from_secs(60),
            live_lookback: Duration::from_secs(20 * 60),
            success_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(2),
            demo_window: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterializeOutcome {
    Published(FeatureVector),
    NotEnoughData { rows: usize },
}

/// Periodically turns the trade window into a feature vector in the cache slot of its mode.
pub struct FeatureMaterializer {
    mode: SourceMode,
    repository: Arc<dyn TradeRepository>,
    cache: Arc<dyn FeatureCache>,
    metrics: Metrics,
    config: MaterializerConfig,
}

impl FeatureMaterializer {
    pub fn new(
        mode: SourceMode,
        repository: Arc<dyn TradeRepository>,
        cache: Arc<dyn FeatureCache>,
        metrics: Metrics,
        config: MaterializerConfig,
    ) -> Self {
        Self {
            mode,
            repository,
            cache,
            metrics,
            config,
        }
    }

    pub async fn materialize_once(&self) -> Result<MaterializeOutcome> {
        let trades = match self.mode {
            SourceMode::Live => {
                let lookback = chrono::Duration::from_std(self.config.live_lookback)?;
                self.repository.since(Utc::now() - lookback).await?
            }
            SourceMode::Replay => self.repository.all().await?,
        };

        let rows = trades.len();
        if rows < self.config.min_rows {
            return Ok(MaterializeOutcome::NotEnoughData { rows });
        }

        let prices: Vec<f64> = trades.iter().map(|t| t.price).collect();
        let Some(vector) = compute_features(&prices) else {
            return Ok(MaterializeOutcome::NotEnoughData { rows });
        };

        self.cache
            .publish(self.mode, &vector, self.config.ttl)
            .await?;
        Ok(MaterializeOutcome::Published(vector))
    }

    /// Run cycles until the task is dropped.
    pub async fn run(&self) {
        info!(mode = %self.mode, "Feature materializer started");
        loop {
            let wait = match self.materialize_once().await {
                Ok(MaterializeOutcome::Published(vector)) => {
                    self.metrics
                        .inc_materializations(self.mode.as_str(), "published");
                    debug!(
                        ret_1s = vector.ret_1s,
                        vol_60s = vector.vol_60s,
                        z_30s = vector.z_30s,
                        "features published"
                    );
                    self.config.success_interval
                }
                Ok(MaterializeOutcome::NotEnoughData { rows }) => {
                    self.metrics
                        .inc_materializations(self.mode.as_str(), "not_enough_data");
                    debug!(rows, min_rows = self.config.min_rows, "not enough data");
                    self.config.retry_interval
                }
                Err(e) => {
                    self.metrics
                        .inc_materializations(self.mode.as_str(), "error");
                    warn!("Materialization failed: {:#}", e);
                    self.config.retry_interval
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

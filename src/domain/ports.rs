use crate::domain::errors::ModelError;
use crate::domain::feed::FeedStatus;
use crate::domain::types::{FeatureVector, SourceMode};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One connection's worth of an external trade feed.
///
/// A session connects, subscribes and forwards trades until the connection
/// ends. Reconnecting is the caller's job.
#[async_trait]
pub trait TradeFeed: Send + Sync {
    async fn run_session(&self, status: &FeedStatus) -> Result<()>;
}

/// Ephemeral slot -> feature map store with per-key expiry
#[async_trait]
pub trait FeatureCache: Send + Sync {
    /// Replace the whole vector in `slot` and reset its expiry to `ttl`.
    async fn publish(&self, slot: SourceMode, vector: &FeatureVector, ttl: Duration) -> Result<()>;

    /// Current vector in `slot`, or `None` when absent or expired.
    async fn read(&self, slot: SourceMode) -> Result<Option<FeatureVector>>;
}

/// Interface for anomaly detection models
pub trait AnomalyModel: Send + Sync {
    /// Raw model output; `-1.0` marks an anomaly.
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// A model loaded from the store, with a label describing where it came from.
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn AnomalyModel>,
    pub label: String,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model.name())
            .field("label", &self.label)
            .finish()
    }
}

/// Versioned artifact store keyed by model name and stage
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Version promoted to `stage`, if any
    async fn load_stage(&self, name: &str, stage: &str) -> Result<Option<LoadedModel>>;

    /// Artifact of the most recent training run, if any
    async fn load_latest_run(&self, name: &str) -> Result<Option<LoadedModel>>;
}

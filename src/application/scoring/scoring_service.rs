use crate::application::scoring::model_provider::ModelProvider;
use crate::domain::ports::FeatureCache;
use crate::domain::repositories::TradeRepository;
use crate::domain::types::{FeatureVector, SourceMode};
use crate::infrastructure::observability::{LatencyGuard, Metrics};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REASON_NO_FEATURES: &str = "no_features";
pub const REASON_NO_MODEL: &str = "no_model";
pub const REASON_MODEL_ERROR: &str = "model_error";

/// Body of `GET /score`. Not-ready is a normal answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScoreResponse {
    Ready {
        ready: bool,
        anomaly: bool,
        score_raw: f64,
        model: String,
        features: FeatureVector,
    },
    NotReady {
        ready: bool,
        reason: String,
    },
}

impl ScoreResponse {
    pub fn ready(anomaly: bool, score_raw: f64, model: String, features: FeatureVector) -> Self {
        Self::Ready {
            ready: true,
            anomaly,
            score_raw,
            model,
            features,
        }
    }

    pub fn not_ready(reason: &str) -> Self {
        Self::NotReady {
            ready: false,
            reason: reason.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Body of `GET /demo/data`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoData {
    /// Epoch seconds
    pub times: Vec<f64>,
    pub prices: Vec<f64>,
    pub anomaly: Option<bool>,
    pub score: Option<f64>,
}

pub struct ScoringService {
    mode: SourceMode,
    cache: Arc<dyn FeatureCache>,
    repository: Arc<dyn TradeRepository>,
    provider: Arc<ModelProvider>,
    metrics: Metrics,
    demo_window: Duration,
}

impl ScoringService {
    pub fn new(
        mode: SourceMode,
        cache: Arc<dyn FeatureCache>,
        repository: Arc<dyn TradeRepository>,
        provider: Arc<ModelProvider>,
        metrics: Metrics,
        demo_window: Duration,
    ) -> Self {
        Self {
            mode,
            cache,
            repository,
            provider,
            metrics,
            demo_window,
        }
    }

    async fn read_features(&self, slot: SourceMode) -> Option<FeatureVector> {
        match self.cache.read(slot).await {
            Ok(features) => features,
            Err(e) => {
                warn!(slot = %slot, "Feature cache read failed: {:#}", e);
                None
            }
        }
    }

    /// Score the latest vector in `slot`. `Err` carries the not-ready reason.
    async fn infer(&self, slot: SourceMode) -> Result<(f64, String, FeatureVector), &'static str> {
        let features = self.read_features(slot).await.ok_or(REASON_NO_FEATURES)?;

        if !self.provider.is_loaded() {
            debug!("Model not loaded yet, loading on first use");
        }
        let loaded = match self.provider.get().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("{}", e);
                return Err(REASON_NO_MODEL);
            }
        };

        match loaded.model.predict(&features) {
            Ok(y) => Ok((y, loaded.label.clone(), features)),
            Err(e) => {
                error!(model = %loaded.label, "{}", e);
                Err(REASON_MODEL_ERROR)
            }
        }
    }

    pub async fn score(&self) -> ScoreResponse {
        self.metrics.predictions_total.inc();
        let _latency = LatencyGuard::new(&self.metrics.predict_latency_seconds);

        match self.infer(self.mode).await {
            Ok((y, label, features)) => {
                let anomaly = y == -1.0;
                info!(anomaly, score = y, "scored");
                ScoreResponse::ready(anomaly, y, label, features)
            }
            Err(reason) => {
                warn!(reason, "not ready");
                ScoreResponse::not_ready(reason)
            }
        }
    }

    /// Recent trades plus the current live anomaly flag.
    pub async fn demo_data(&self) -> DemoData {
        let window = chrono::Duration::from_std(self.demo_window)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let trades = match self.repository.since(Utc::now() - window).await {
            Ok(trades) => trades,
            Err(e) => {
                warn!("Demo trade window unavailable: {:#}", e);
                Vec::new()
            }
        };

        let (anomaly, score) = match self.infer(SourceMode::Live).await {
            Ok((y, _, _)) => (Some(y == -1.0), Some(y)),
            Err(_) => (None, None),
        };

        DemoData {
            times: trades
                .iter()
                .map(|t| t.timestamp.timestamp_micros() as f64 / 1_000_000.0)
                .collect(),
            prices: trades.iter().map(|t| t.price).collect(),
            anomaly,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::AnomalyModel;
    use crate::domain::types::Trade;
    use crate::infrastructure::cache::InMemoryFeatureCache;
    use crate::infrastructure::mock::{
        FailingModel, InMemoryTradeRepository, MockModelStore, StaticModel,
    };

    fn features() -> FeatureVector {
        FeatureVector {
            ret_1s: 0.0004,
            ret_5s: 0.001,
            ret_30s: -0.002,
            ewma_30s: 100.02,
            vol_60s: 0.0003,
            z_30s: 1.2,
        }
    }

    struct Fixture {
        service: ScoringService,
        cache: Arc<InMemoryFeatureCache>,
        repo: Arc<InMemoryTradeRepository>,
        metrics: Metrics,
    }

    fn fixture(mode: SourceMode, store: MockModelStore) -> Fixture {
        let cache = Arc::new(InMemoryFeatureCache::new());
        let repo = Arc::new(InMemoryTradeRepository::new());
        let metrics = Metrics::new().unwrap();
        let provider = Arc::new(ModelProvider::new("iforest", Arc::new(store)));
        let service = ScoringService::new(
            mode,
            cache.clone(),
            repo.clone(),
            provider,
            metrics.clone(),
            Duration::from_secs(300),
        );
        Fixture {
            service,
            cache,
            repo,
            metrics,
        }
    }

    #[tokio::test]
    async fn test_empty_cache_does_not_touch_model() {
        let model = Arc::new(StaticModel::new(-1.0));
        let store = MockModelStore::new().with_stage(model.clone());
        let fx = fixture(SourceMode::Live, store);

        let response = fx.service.score().await;
        assert_eq!(response, ScoreResponse::not_ready(REASON_NO_FEATURES));
        assert_eq!(model.calls(), 0);
        assert_eq!(fx.metrics.predictions_total.get(), 1);
        assert_eq!(fx.metrics.predict_latency_seconds.get_sample_count(), 1);
    }

    #[tokio::test]
    async fn test_no_model_reason() {
        let fx = fixture(SourceMode::Live, MockModelStore::new());
        fx.cache
            .publish(SourceMode::Live, &features(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            fx.service.score().await,
            ScoreResponse::not_ready(REASON_NO_MODEL)
        );
    }

    #[tokio::test]
    async fn test_anomaly_response_shape() {
        let store = MockModelStore::new().with_run("abc123", Arc::new(StaticModel::new(-1.0)));
        let fx = fixture(SourceMode::Replay, store);
        fx.cache
            .publish(SourceMode::Replay, &features(), Duration::from_secs(60))
            .await
            .unwrap();

        let response = fx.service.score().await;
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ready"], true);
        assert_eq!(json["anomaly"], true);
        assert_eq!(json["score_raw"], -1.0);
        assert_eq!(json["model"], "iforest@run:abc123");
        assert_eq!(json["features"]["z_30s"], 1.2);
        assert_eq!(json["features"].as_object().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_inlier_and_mode_slot() {
        let store = MockModelStore::new().with_stage(Arc::new(StaticModel::new(1.0)));
        let fx = fixture(SourceMode::Live, store);
        // Replay slot is not read by a live service
        fx.cache
            .publish(SourceMode::Replay, &features(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!fx.service.score().await.is_ready());

        fx.cache
            .publish(SourceMode::Live, &features(), Duration::from_secs(60))
            .await
            .unwrap();
        let ScoreResponse::Ready { anomaly, model, .. } = fx.service.score().await else {
            panic!("expected ready");
        };
        assert!(!anomaly);
        assert_eq!(model, "iforest@Production");
    }

    #[tokio::test]
    async fn test_prediction_failure_is_not_ready() {
        let failing: Arc<dyn AnomalyModel> = Arc::new(FailingModel);
        let fx = fixture(SourceMode::Live, MockModelStore::new().with_stage(failing));
        fx.cache
            .publish(SourceMode::Live, &features(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            fx.service.score().await,
            ScoreResponse::not_ready(REASON_MODEL_ERROR)
        );
    }

    #[tokio::test]
    async fn test_demo_data_window_and_live_flag() {
        let store = MockModelStore::new().with_stage(Arc::new(StaticModel::new(-1.0)));
        let fx = fixture(SourceMode::Replay, store);

        let now = Utc::now();
        fx.repo
            .insert(&Trade::new(now - chrono::Duration::minutes(10), 99.0, 0.1))
            .await
            .unwrap();
        fx.repo
            .insert(&Trade::new(now - chrono::Duration::seconds(30), 100.0, 0.1))
            .await
            .unwrap();

        let empty = fx.service.demo_data().await;
        assert_eq!(empty.prices, vec![100.0]);
        assert_eq!(empty.anomaly, None);
        assert_eq!(empty.score, None);

        fx.cache
            .publish(SourceMode::Live, &features(), Duration::from_secs(60))
            .await
            .unwrap();
        let data = fx.service.demo_data().await;
        assert_eq!(data.times.len(), 1);
        assert_eq!(data.anomaly, Some(true));
        assert_eq!(data.score, Some(-1.0));
    }

    #[test]
    fn test_not_ready_serialization() {
        let json = serde_json::to_string(&ScoreResponse::not_ready("no_features")).unwrap();
        assert_eq!(json, r#"{"ready":false,"reason":"no_features"}"#);
    }
}

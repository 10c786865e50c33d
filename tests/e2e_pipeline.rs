use blink::application::features::{FeatureMaterializer, MaterializeOutcome, MaterializerConfig};
use blink::application::scoring::{ModelProvider, ScoreResponse, ScoringService};
use blink::domain::ports::FeatureCache;
use blink::domain::repositories::TradeRepository;
use blink::domain::types::{SourceMode, Trade};
use blink::infrastructure::cache::InMemoryFeatureCache;
use blink::infrastructure::mock::{InMemoryTradeRepository, MockModelStore, StaticModel};
use blink::infrastructure::observability::Metrics;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

/// 91 noisy ticks around 100, one per second, the last one now.
async fn seed_ticks(repo: &InMemoryTradeRepository) {
    let mut rng = StdRng::seed_from_u64(42);
    let now = Utc::now();
    for i in 0..91 {
        let ts = now - chrono::Duration::seconds(90 - i);
        let price = 100.0 + rng.random_range(-0.05..0.05);
        assert!(repo.insert(&Trade::new(ts, price, 0.01)).await.unwrap());
    }
}

#[tokio::test]
async fn test_trades_to_score() {
    let repo = Arc::new(InMemoryTradeRepository::new());
    let cache = Arc::new(InMemoryFeatureCache::new());
    let metrics = Metrics::new().unwrap();
    seed_ticks(&repo).await;

    let materializer = FeatureMaterializer::new(
        SourceMode::Live,
        repo.clone(),
        cache.clone(),
        metrics.clone(),
        MaterializerConfig::default(),
    );
    let MaterializeOutcome::Published(vector) = materializer.materialize_once().await.unwrap()
    else {
        panic!("91 rows must be enough to publish");
    };
    assert!(vector.is_finite());
    assert!((vector.ewma_30s - 100.0).abs() < 0.1);
    // Noise of at most 0.05 either side of 100 bounds one-step returns by ~1e-3
    assert!(vector.ret_1s.abs() < 2e-3, "ret_1s = {}", vector.ret_1s);
    assert!(vector.ret_5s.abs() < 2e-3);
    assert!(vector.ret_30s.abs() < 2e-3);
    assert!(vector.vol_60s > 0.0 && vector.vol_60s < 2e-3);

    let cached = cache.read(SourceMode::Live).await.unwrap();
    assert_eq!(cached, Some(vector));
    assert_eq!(cache.read(SourceMode::Replay).await.unwrap(), None);

    let model = Arc::new(StaticModel::new(-1.0));
    let store = MockModelStore::new().with_stage(model.clone());
    let provider = Arc::new(ModelProvider::new("blink_iforest", Arc::new(store)));
    let scoring = ScoringService::new(
        SourceMode::Live,
        cache.clone(),
        repo.clone(),
        provider,
        metrics.clone(),
        Duration::from_secs(300),
    );

    match scoring.score().await {
        ScoreResponse::Ready {
            ready,
            anomaly,
            score_raw,
            model: label,
            features,
        } => {
            assert!(ready);
            assert!(anomaly);
            assert_eq!(score_raw, -1.0);
            assert_eq!(label, "blink_iforest@Production");
            assert_eq!(features, vector);
        }
        other => panic!("expected a ready score, got {:?}", other),
    }
    assert_eq!(model.calls(), 1);

    let demo = scoring.demo_data().await;
    assert_eq!(demo.prices.len(), 91);
    assert_eq!(demo.anomaly, Some(true));
    assert!(demo.times.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_short_history_publishes_nothing() {
    let repo = Arc::new(InMemoryTradeRepository::new());
    let cache = Arc::new(InMemoryFeatureCache::new());
    let now = Utc::now();
    for i in 0..89 {
        let ts = now - chrono::Duration::seconds(89 - i);
        repo.insert(&Trade::new(ts, 100.0, 0.01)).await.unwrap();
    }

    let materializer = FeatureMaterializer::new(
        SourceMode::Live,
        repo.clone(),
        cache.clone(),
        Metrics::new().unwrap(),
        MaterializerConfig::default(),
    );
    assert_eq!(
        materializer.materialize_once().await.unwrap(),
        MaterializeOutcome::NotEnoughData { rows: 89 }
    );
    assert_eq!(cache.read(SourceMode::Live).await.unwrap(), None);
    assert_eq!(repo.count().await.unwrap(), 89);
}

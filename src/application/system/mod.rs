use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, error, info, info_span};

use crate::application::bootstrap::persistence::{PersistenceBootstrap, PersistenceHandle};
use crate::application::features::{FeatureMaterializer, MaterializerConfig};
use crate::application::ingestion::{FeedSupervisor, FixedDelay, ReplayConnector, ReplaySummary};
use crate::application::scoring::{ModelProvider, ScoringService};
use crate::config::Config;
use crate::domain::feed::FeedState;
use crate::domain::ports::FeatureCache;
use crate::domain::types::SourceMode;
use crate::infrastructure::cache::InMemoryFeatureCache;
use crate::infrastructure::coinbase::CoinbaseTradeFeed;
use crate::infrastructure::ml::FileModelStore;
use crate::infrastructure::observability::Metrics;
use crate::interfaces::http::middleware::in_span;
use crate::interfaces::http::{AppState, create_router};
use axum::middleware::from_fn_with_state;

/// Handles on the background tasks started by [`Application::start`].
pub struct SystemHandle {
    pub tasks: Vec<JoinHandle<()>>,
}

impl SystemHandle {
    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Everything the pipeline shares, built once at startup.
pub struct Application {
    pub config: Config,
    pub persistence: PersistenceHandle,
    pub cache: Arc<dyn FeatureCache>,
    pub metrics: Metrics,
    pub scoring: Arc<ScoringService>,
    pub materializer_config: MaterializerConfig,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building Blink Application (Mode: {}, Pair: {})...",
            config.mode, config.pair
        );

        let metrics = Metrics::new()?;
        let persistence = PersistenceBootstrap::init(&config.database_url).await?;
        let cache: Arc<dyn FeatureCache> = Arc::new(InMemoryFeatureCache::new());

        let store = Arc::new(FileModelStore::new(config.model_store_path.clone()));
        let model_provider = Arc::new(ModelProvider::new(&config.model_name, store));

        let materializer_config = MaterializerConfig::default();
        let scoring = Arc::new(ScoringService::new(
            config.mode,
            cache.clone(),
            persistence.trade_repository.clone(),
            model_provider,
            metrics.clone(),
            materializer_config.demo_window,
        ));

        Ok(Self {
            config,
            persistence,
            cache,
            metrics,
            scoring,
            materializer_config,
        })
    }

    fn span(&self, component: &'static str) -> Span {
        info_span!(
            "task",
            service = %self.config.observability.service_name,
            component
        )
    }

    pub fn router(&self) -> axum::Router {
        let state = AppState::new(self.scoring.clone(), self.metrics.clone());
        create_router(state, self.config.observability.request_logs)
            .layer(from_fn_with_state(self.span("api"), in_span))
    }

    pub fn feed_supervisor(&self) -> FeedSupervisor {
        let feed = Arc::new(CoinbaseTradeFeed::new(
            self.config.feed.ws_url.clone(),
            self.config.pair.clone(),
            self.config.feed.ping_interval(),
            self.config.feed.ping_timeout(),
            self.persistence.trade_repository.clone(),
            self.metrics.clone(),
        ));
        FeedSupervisor::new(
            feed,
            Box::new(FixedDelay::new(self.config.feed.reconnect_delay())),
            self.metrics.clone(),
        )
    }

    /// Start the live feed; returns the task and a view of its connection state.
    pub fn spawn_feed(&self) -> (JoinHandle<()>, watch::Receiver<FeedState>) {
        let supervisor = self.feed_supervisor();
        let state = supervisor.status().subscribe();
        let task = tokio::spawn(
            async move { supervisor.run().await }.instrument(self.span("ingestor")),
        );
        (task, state)
    }

    pub fn spawn_materializer(&self) -> JoinHandle<()> {
        let materializer = FeatureMaterializer::new(
            self.config.mode,
            self.persistence.trade_repository.clone(),
            self.cache.clone(),
            self.metrics.clone(),
            self.materializer_config.clone(),
        );
        tokio::spawn(async move { materializer.run().await }.instrument(self.span("features")))
    }

    pub fn replay_connector(&self) -> ReplayConnector {
        ReplayConnector::new(
            self.persistence.trade_repository.clone(),
            self.metrics.clone(),
            self.config.sampler.progress_every,
        )
    }

    /// Backfill the Trade Store from `source`, to completion.
    pub async fn run_replay(&self, source: &Path) -> Result<ReplaySummary> {
        self.replay_connector()
            .run(source, &self.config.sampler)
            .instrument(self.span("sampler"))
            .await
    }

    pub fn spawn_replay(&self, source: PathBuf) -> JoinHandle<()> {
        let connector = self.replay_connector();
        let config = self.config.sampler.clone();
        tokio::spawn(
            async move {
                if let Err(e) = connector.run(&source, &config).await {
                    error!("Replay failed: {:#}", e);
                }
            }
            .instrument(self.span("sampler")),
        )
    }

    /// Start the background pipeline for the configured mode.
    pub fn start(&self) -> SystemHandle {
        let mut tasks = Vec::new();

        match self.config.mode {
            SourceMode::Live => {
                let (task, _) = self.spawn_feed();
                tasks.push(task);
            }
            SourceMode::Replay => {
                tasks.push(self.spawn_replay(self.config.sampler.source_path.clone()));
            }
        }
        tasks.push(self.spawn_materializer());

        info!("Pipeline started ({} tasks)", tasks.len());
        SystemHandle { tasks }
    }

    /// Close the Trade Store pool once all writers have stopped.
    pub async fn close(&self) {
        self.persistence.db.pool.close().await;
        info!("Trade Store closed");
    }
}

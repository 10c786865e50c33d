use crate::application::ingestion::reconnect_policy::ReconnectPolicy;
use crate::domain::feed::{FeedState, FeedStatus};
use crate::domain::ports::TradeFeed;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use tracing::{info, warn};

/// Drives a [`TradeFeed`] forever: one session at a time, reconnecting after
/// every session end according to the reconnect policy.
pub struct FeedSupervisor {
    feed: Arc<dyn TradeFeed>,
    policy: Box<dyn ReconnectPolicy>,
    status: FeedStatus,
    metrics: Metrics,
}

impl FeedSupervisor {
    pub fn new(
        feed: Arc<dyn TradeFeed>,
        policy: Box<dyn ReconnectPolicy>,
        metrics: Metrics,
    ) -> Self {
        Self {
            feed,
            policy,
            status: FeedStatus::new(),
            metrics,
        }
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    /// Run until the task is dropped. Session failures never escape.
    pub async fn run(&self) {
        let mut attempt: u32 = 0;
        loop {
            self.status.set(FeedState::Connecting);

            match self.feed.run_session(&self.status).await {
                Ok(()) => {
                    info!("Feed session ended");
                }
                Err(e) => {
                    warn!("Feed session failed: {:#}", e);
                }
            }

            self.status.set(FeedState::Reconnecting);
            attempt = attempt.saturating_add(1);
            self.metrics.feed_reconnects_total.inc();

            let delay = self.policy.next_delay(attempt);
            info!(attempt, "Reconnecting in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

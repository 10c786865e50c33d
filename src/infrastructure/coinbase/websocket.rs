use crate::application::ingestion::keepalive::KeepaliveMonitor;
use crate::domain::errors::FeedError;
use crate::domain::feed::{FeedState, FeedStatus};
use crate::domain::ports::TradeFeed;
use crate::domain::repositories::TradeRepository;
use crate::infrastructure::coinbase::messages::{parse_match, subscribe_message};
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const METRIC_SOURCE: &str = "feed";

/// Coinbase Exchange `matches` feed for one product, writing into the Trade Store
pub struct CoinbaseTradeFeed {
    ws_url: String,
    pair: String,
    ping_interval: Duration,
    ping_timeout: Duration,
    repository: Arc<dyn TradeRepository>,
    metrics: Metrics,
}

impl CoinbaseTradeFeed {
    pub fn new(
        ws_url: String,
        pair: String,
        ping_interval: Duration,
        ping_timeout: Duration,
        repository: Arc<dyn TradeRepository>,
        metrics: Metrics,
    ) -> Self {
        Self {
            ws_url,
            pair,
            ping_interval,
            ping_timeout,
            repository,
            metrics,
        }
    }

    async fn handle_text(&self, text: &str) {
        let trade = match parse_match(text, &self.pair) {
            Ok(Some(trade)) => trade,
            Ok(None) => return,
            Err(e) => {
                warn!("Dropping malformed feed message: {}", e);
                return;
            }
        };

        match self.repository.insert(&trade).await {
            Ok(true) => {
                self.metrics.inc_ingested(METRIC_SOURCE, "inserted");
                debug!(
                    ts = %trade.timestamp,
                    price = trade.price,
                    size = trade.size,
                    "wrote trade"
                );
            }
            Ok(false) => {
                self.metrics.inc_ingested(METRIC_SOURCE, "duplicate");
                debug!(ts = %trade.timestamp, "duplicate trade ignored");
            }
            Err(e) => {
                // The stream keeps going; this record is lost
                self.metrics.inc_ingested(METRIC_SOURCE, "failed");
                error!(ts = %trade.timestamp, "failed to write trade: {:#}", e);
            }
        }
    }
}

#[async_trait]
impl TradeFeed for CoinbaseTradeFeed {
    async fn run_session(&self, status: &FeedStatus) -> Result<()> {
        info!("Connecting to feed: {}", self.ws_url);

        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .context("Failed to connect to feed WebSocket")?;

        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(subscribe_message(&self.pair).into()))
            .await
            .context("Failed to send subscription message")?;
        status.set(FeedState::Subscribed);
        info!(pair = %self.pair, "Subscribed to matches channel");

        let mut keepalive = KeepaliveMonitor::new("feed", self.ping_timeout);
        let mut ping_interval =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut streaming = false;

        loop {
            tokio::select! {
                frame = read.next() => {
                    let msg = match frame {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            return Err(FeedError::ConnectionLost { reason: e.to_string() }.into());
                        }
                        None => {
                            info!("Feed stream ended");
                            return Ok(());
                        }
                    };

                    if !streaming {
                        streaming = true;
                        status.set(FeedState::Streaming);
                    }

                    match msg {
                        Message::Text(text) => self.handle_text(text.as_str()).await,
                        Message::Ping(payload) => {
                            debug!("Received ping from feed");
                            write
                                .send(Message::Pong(payload))
                                .await
                                .context("Failed to answer ping")?;
                        }
                        Message::Pong(_) => {
                            debug!("Received pong from feed");
                            keepalive.pong_received();
                        }
                        Message::Close(frame) => {
                            if let Some(cf) = frame {
                                info!(
                                    "Feed WebSocket closed by server: Code {} Reason '{}'",
                                    cf.code, cf.reason
                                );
                            } else {
                                info!("Feed WebSocket closed by server (No info)");
                            }
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                _ = keepalive.expired() => {
                    return Err(FeedError::KeepaliveTimeout {
                        timeout: keepalive.timeout(),
                    }
                    .into());
                }
                _ = ping_interval.tick() => {
                    write
                        .send(Message::Ping(Vec::new().into()))
                        .await
                        .context("Failed to send keepalive ping")?;
                    keepalive.ping_sent();
                }
            }
        }
    }
}

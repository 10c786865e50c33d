//! Feed connection configuration parsing from environment variables.

use super::{Lookup, non_empty, parse_or};
use anyhow::Result;
use std::time::Duration;

/// Trade feed environment configuration
#[derive(Debug, Clone)]
pub struct FeedEnvConfig {
    pub ws_url: String,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub reconnect_delay_secs: u64,
}

impl Default for FeedEnvConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://ws-feed.exchange.coinbase.com".to_string(),
            ping_interval_secs: 20,
            ping_timeout_secs: 20,
            reconnect_delay_secs: 2,
        }
    }
}

impl FeedEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            ws_url: non_empty(lookup, "FEED_WS_URL").unwrap_or(defaults.ws_url),
            ping_interval_secs: parse_or(
                lookup,
                "FEED_PING_INTERVAL_SECS",
                defaults.ping_interval_secs,
            )?,
            ping_timeout_secs: parse_or(
                lookup,
                "FEED_PING_TIMEOUT_SECS",
                defaults.ping_timeout_secs,
            )?,
            reconnect_delay_secs: parse_or(
                lookup,
                "FEED_RECONNECT_DELAY_SECS",
                defaults.reconnect_delay_secs,
            )?,
        })
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

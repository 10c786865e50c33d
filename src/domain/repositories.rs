//! Repository Pattern Abstractions
//!
//! The Trade Store is a durable, time-ordered, append-only record of trades
//! keyed by timestamp. Writers only ever insert; readers always receive rows
//! sorted ascending by timestamp, whatever the arrival order was.
//!
//! # Example
//!
//! ```rust,no_run
//! use blink::domain::repositories::TradeRepository;
//! use blink::infrastructure::mock::InMemoryTradeRepository;
//!
//! # async {
//! let repo = InMemoryTradeRepository::new();
//! // let created = repo.insert(&trade).await?;
//! // let window = repo.since(cutoff).await?;
//! # };
//! ```

use crate::domain::types::Trade;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable store of trades, deduplicated by timestamp
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Insert a trade. A trade whose timestamp already exists is absorbed:
    /// returns `Ok(false)` and leaves the stored row untouched.
    async fn insert(&self, trade: &Trade) -> Result<bool>;

    /// Trades strictly after `since`, ascending by timestamp
    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<Trade>>;

    /// Every stored trade, ascending by timestamp
    async fn all(&self) -> Result<Vec<Trade>>;

    /// Count stored trades
    async fn count(&self) -> Result<usize>;
}

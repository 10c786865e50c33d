//! Test doubles for the domain ports.

use crate::domain::errors::ModelError;
use crate::domain::ports::{AnomalyModel, LoadedModel, ModelStore};
use crate::domain::repositories::TradeRepository;
use crate::domain::types::{FeatureVector, Trade};
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Trade store kept in a sorted map, with the same idempotent insert semantics
/// as the SQLite store.
#[derive(Clone, Default)]
pub struct InMemoryTradeRepository {
    trades: Arc<RwLock<BTreeMap<DateTime<Utc>, Trade>>>,
    fail_inserts: Arc<AtomicBool>,
}

impl InMemoryTradeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail until switched back.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeRepository {
    async fn insert(&self, trade: &Trade) -> Result<bool> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("simulated store outage");
        }
        let mut trades = self.trades.write().await;
        if trades.contains_key(&trade.timestamp) {
            return Ok(false);
        }
        trades.insert(trade.timestamp, *trade);
        Ok(true)
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<Trade>> {
        let trades = self.trades.read().await;
        Ok(trades
            .range(since..)
            .filter(|(ts, _)| **ts > since)
            .map(|(_, t)| *t)
            .collect())
    }

    async fn all(&self) -> Result<Vec<Trade>> {
        Ok(self.trades.read().await.values().copied().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.trades.read().await.len())
    }
}

/// Model returning a fixed output and counting invocations.
pub struct StaticModel {
    output: f64,
    calls: AtomicUsize,
}

impl StaticModel {
    pub fn new(output: f64) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnomalyModel for StaticModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output)
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Model whose every prediction fails.
pub struct FailingModel;

impl AnomalyModel for FailingModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::Prediction {
            reason: "simulated inference failure".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Model store with configurable stage/run availability that counts loads.
#[derive(Default)]
pub struct MockModelStore {
    stage_model: Option<Arc<dyn AnomalyModel>>,
    run_model: Option<(String, Arc<dyn AnomalyModel>)>,
    stage_fails: bool,
    load_delay: Duration,
    stage_loads: AtomicUsize,
    run_loads: AtomicUsize,
}

impl MockModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, model: Arc<dyn AnomalyModel>) -> Self {
        self.stage_model = Some(model);
        self
    }

    pub fn with_run(mut self, run_id: &str, model: Arc<dyn AnomalyModel>) -> Self {
        self.run_model = Some((run_id.to_string(), model));
        self
    }

    /// Stage lookups return an error instead of a model.
    pub fn with_failing_stage(mut self) -> Self {
        self.stage_fails = true;
        self
    }

    /// Every load sleeps this long first.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn stage_loads(&self) -> usize {
        self.stage_loads.load(Ordering::SeqCst)
    }

    pub fn run_loads(&self) -> usize {
        self.run_loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelStore for MockModelStore {
    async fn load_stage(&self, name: &str, stage: &str) -> Result<Option<LoadedModel>> {
        self.stage_loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.stage_fails {
            bail!("simulated model store outage");
        }
        Ok(self.stage_model.as_ref().map(|model| LoadedModel {
            model: model.clone(),
            label: format!("{}@{}", name, stage),
        }))
    }

    async fn load_latest_run(&self, name: &str) -> Result<Option<LoadedModel>> {
        self.run_loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        Ok(self.run_model.as_ref().map(|(run_id, model)| LoadedModel {
            model: model.clone(),
            label: format!("{}@run:{}", name, run_id),
        }))
    }
}

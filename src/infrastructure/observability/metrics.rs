//! Prometheus metrics definitions for Blink
//!
//! All metrics use the `blink_` prefix.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the ingestion and scoring pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Score requests served
    pub predictions_total: IntCounter,
    /// Score request latency in seconds
    pub predict_latency_seconds: Histogram,
    /// Trades handed to the store, by source and outcome
    pub trades_ingested_total: IntCounterVec,
    /// Feed reconnection attempts
    pub feed_reconnects_total: IntCounter,
    /// Materializer cycles, by mode and outcome
    pub materializations_total: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with all counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = IntCounter::with_opts(Opts::new(
            "blink_predictions_total",
            "Total score requests",
        ))?;
        registry.register(Box::new(predictions_total.clone()))?;

        let predict_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "blink_predict_latency_seconds",
                "Score request latency in seconds",
            )
            .buckets(vec![
                0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(predict_latency_seconds.clone()))?;

        let trades_ingested_total = IntCounterVec::new(
            Opts::new(
                "blink_trades_ingested_total",
                "Trades handed to the store by source and outcome",
            ),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(trades_ingested_total.clone()))?;

        let feed_reconnects_total = IntCounter::with_opts(Opts::new(
            "blink_feed_reconnects_total",
            "Total feed reconnection attempts",
        ))?;
        registry.register(Box::new(feed_reconnects_total.clone()))?;

        let materializations_total = IntCounterVec::new(
            Opts::new(
                "blink_materializations_total",
                "Materializer cycles by mode and outcome",
            ),
            &["mode", "outcome"],
        )?;
        registry.register(Box::new(materializations_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            predict_latency_seconds,
            trades_ingested_total,
            feed_reconnects_total,
            materializations_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Count one trade insert attempt
    pub fn inc_ingested(&self, source: &str, outcome: &str) {
        self.trades_ingested_total
            .with_label_values(&[source, outcome])
            .inc();
    }

    /// Count one materializer cycle
    pub fn inc_materializations(&self, mode: &str, outcome: &str) {
        self.materializations_total
            .with_label_values(&[mode, outcome])
            .inc();
    }
}

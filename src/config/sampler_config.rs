//! Replay source (sampler) configuration parsing from environment variables.

use super::{Lookup, non_empty, parse_bool, parse_or};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SamplerEnvConfig {
    pub source_path: PathBuf,
    pub ts_column: String,
    pub price_column: String,
    /// When unset every row gets `size_default`
    pub size_column: Option<String>,
    pub size_default: f64,
    /// Timestamps are epoch seconds rather than calendar strings
    pub time_is_unix: bool,
    pub progress_every: usize,
}

impl Default for SamplerEnvConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/sample_trades.csv"),
            ts_column: "ts".to_string(),
            price_column: "price".to_string(),
            size_column: None,
            size_default: 0.001,
            time_is_unix: false,
            progress_every: 500,
        }
    }
}

impl SamplerEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            source_path: non_empty(lookup, "SAMPLE_SOURCE")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_path),
            ts_column: non_empty(lookup, "TS_COLUMN").unwrap_or(defaults.ts_column),
            price_column: non_empty(lookup, "PRICE_COLUMN").unwrap_or(defaults.price_column),
            size_column: non_empty(lookup, "SIZE_COLUMN"),
            size_default: parse_or(lookup, "SIZE_DEFAULT", defaults.size_default)?,
            time_is_unix: parse_bool(lookup, "TIME_IS_UNIX", defaults.time_is_unix),
            progress_every: defaults.progress_every,
        })
    }
}

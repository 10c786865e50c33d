//! Configuration module for Blink.
//!
//! Configuration is loaded once at process start from environment variables,
//! organized by concern: Feed, Sampler (replay source) and Observability.
//! A missing required variable is fatal: the process must refuse to start.

mod feed_config;
mod observability_config;
mod sampler_config;

pub use feed_config::FeedEnvConfig;
pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use sampler_config::SamplerEnvConfig;

use crate::domain::types::SourceMode;
use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Source of raw configuration values, keyed by variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Core
    pub pair: String,
    pub model_name: String,
    pub model_store_path: PathBuf,
    pub database_url: String,
    pub mode: SourceMode,

    pub feed: FeedEnvConfig,
    pub sampler: SamplerEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let pair = required(lookup, "PAIR")?;
        let model_name = required(lookup, "MODEL_NAME")?;
        let model_store_path = parse_model_store(&required(lookup, "MODEL_STORE_URI")?)?;
        let database_url = required(lookup, "DATABASE_URL")?;

        let mode = match non_empty(lookup, "INGEST_MODE") {
            Some(raw) => SourceMode::from_str(&raw)?,
            None => SourceMode::Live,
        };

        let feed = FeedEnvConfig::from_lookup(lookup).context("Failed to load feed config")?;
        let sampler =
            SamplerEnvConfig::from_lookup(lookup).context("Failed to load sampler config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup)
            .context("Failed to load observability config")?;

        Ok(Self {
            pair,
            model_name,
            model_store_path,
            database_url,
            mode,
            feed,
            sampler,
            observability,
        })
    }
}

/// Value of a required variable; absent or blank is an error.
pub(crate) fn required(lookup: Lookup<'_>, key: &str) -> Result<String> {
    match non_empty(lookup, key) {
        Some(v) => Ok(v),
        None => bail!("Missing required env var: {}", key),
    }
}

pub(crate) fn non_empty(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn parse_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}='{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

pub(crate) fn parse_bool(lookup: Lookup<'_>, key: &str, default: bool) -> bool {
    match non_empty(lookup, key) {
        Some(raw) => matches!(
            raw.to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        None => default,
    }
}

/// `file://` URLs and plain paths are accepted; any other scheme is rejected.
fn parse_model_store(raw: &str) -> Result<PathBuf> {
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| anyhow::anyhow!("Invalid MODEL_STORE_URI file URL: {}", raw)),
        // Windows drive letters parse as a one-letter scheme
        Ok(url) if url.scheme().len() > 1 => {
            bail!(
                "Unsupported MODEL_STORE_URI scheme '{}': only file:// or a local path",
                url.scheme()
            )
        }
        _ => Ok(PathBuf::from(raw)),
    }
}

use crate::domain::errors::FeatureDecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Feature names in model input order.
pub const FEATURE_KEYS: [&str; 6] = ["ret_1s", "ret_5s", "ret_30s", "ewma_30s", "vol_60s", "z_30s"];

/// One executed trade on the monitored instrument. The timestamp is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
}

impl Trade {
    pub fn new(timestamp: DateTime<Utc>, price: f64, size: f64) -> Self {
        Self {
            timestamp,
            price,
            size,
        }
    }
}

/// Six-value summary of recent price dynamics, used as model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub ret_1s: f64,
    pub ret_5s: f64,
    pub ret_30s: f64,
    pub ewma_30s: f64,
    pub vol_60s: f64,
    pub z_30s: f64,
}

impl FeatureVector {
    /// Values in `FEATURE_KEYS` order.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.ret_1s,
            self.ret_5s,
            self.ret_30s,
            self.ewma_30s,
            self.vol_60s,
            self.z_30s,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Hash-style field map with string-encoded floats.
    pub fn to_fields(&self) -> HashMap<String, String> {
        FEATURE_KEYS
            .iter()
            .zip(self.to_array())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, FeatureDecodeError> {
        let field = |key: &str| -> Result<f64, FeatureDecodeError> {
            let raw = fields
                .get(key)
                .ok_or_else(|| FeatureDecodeError::MissingField(key.to_string()))?;
            raw.parse::<f64>()
                .map_err(|_| FeatureDecodeError::InvalidValue {
                    field: key.to_string(),
                    value: raw.clone(),
                })
        };

        Ok(Self {
            ret_1s: field("ret_1s")?,
            ret_5s: field("ret_5s")?,
            ret_30s: field("ret_30s")?,
            ewma_30s: field("ewma_30s")?,
            vol_60s: field("vol_60s")?,
            z_30s: field("z_30s")?,
        })
    }
}

/// Where trades come from. Selects the data source and the cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Live,
    Replay,
}

impl SourceMode {
    /// Key of the hash entry in the feature cache.
    pub fn cache_key(&self) -> &'static str {
        match self {
            SourceMode::Live => "latest_features",
            SourceMode::Replay => "sampler_features",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Live => "live",
            SourceMode::Replay => "replay",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(SourceMode::Live),
            "replay" | "sample" | "sampler" => Ok(SourceMode::Replay),
            _ => anyhow::bail!("Invalid INGEST_MODE: {}. Must be 'live' or 'replay'", s),
        }
    }
}

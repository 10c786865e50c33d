//! Observability configuration parsing from environment variables.
//!
//! This module handles logging and the HTTP listener settings.

use super::{Lookup, non_empty, parse_bool};
use anyhow::{Result, bail};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            _ => bail!("Invalid LOG_FORMAT: {}. Must be 'plain' or 'json'", s),
        }
    }
}

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub service_name: String,
    pub request_logs: bool,
    pub http_bind: String,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            log_format: LogFormat::Plain,
            service_name: "app".to_string(),
            request_logs: true,
            http_bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let log_format = match non_empty(lookup, "LOG_FORMAT") {
            Some(raw) => LogFormat::from_str(&raw)?,
            None => defaults.log_format,
        };

        Ok(Self {
            log_level: non_empty(lookup, "LOG_LEVEL")
                .map(|v| v.to_uppercase())
                .unwrap_or(defaults.log_level),
            log_format,
            service_name: non_empty(lookup, "SERVICE_NAME").unwrap_or(defaults.service_name),
            request_logs: parse_bool(lookup, "REQUEST_LOGS", defaults.request_logs),
            http_bind: non_empty(lookup, "HTTP_BIND").unwrap_or(defaults.http_bind),
        })
    }
}

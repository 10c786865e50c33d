//! Process-wide tracing subscriber setup.

use crate::config::{LogFormat, ObservabilityEnvConfig};
use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Build the filter: `LOG_LEVEL` as the default directive, `RUST_LOG` directives on top.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    let base = parse_level(level)?;
    Ok(EnvFilter::builder()
        .with_default_directive(base.into())
        .from_env_lossy())
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    let normalized = match level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    normalized
        .parse::<LevelFilter>()
        .map_err(|e| anyhow!("Invalid LOG_LEVEL '{}': {}", level, e))
}

/// Install the global subscriber. Call once per binary.
pub fn init_tracing(config: &ObservabilityEnvConfig) -> Result<()> {
    let filter = build_filter(&config.log_level)?;

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names_are_case_insensitive() {
        assert!(build_filter("INFO").is_ok());
        assert!(build_filter("debug").is_ok());
        assert!(build_filter("Warn").is_ok());
    }

    #[test]
    fn test_level_aliases() {
        assert_eq!(parse_level("WARNING").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("CRITICAL").unwrap(), LevelFilter::ERROR);
    }

    #[test]
    fn test_bogus_level_rejected() {
        assert!(parse_level("chatty").is_err());
    }
}

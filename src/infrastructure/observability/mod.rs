//! Observability for Blink
//!
//! Metrics are scraped over HTTP at `/metrics`. Logs go to stdout as plain
//! text or JSON lines.

pub mod latency_tracker;
pub mod logging;
pub mod metrics;

pub use latency_tracker::LatencyGuard;
pub use logging::init_tracing;
pub use metrics::Metrics;

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Tracks the outstanding keepalive ping of one feed connection.
///
/// A connection is considered dead once a ping has gone unanswered for
/// `timeout`. Only pongs clear the outstanding ping.
pub struct KeepaliveMonitor {
    awaiting_pong_since: Option<Instant>,
    timeout: Duration,
    name: String,
}

impl KeepaliveMonitor {
    pub fn new(name: &str, timeout: Duration) -> Self {
        Self {
            awaiting_pong_since: None,
            timeout,
            name: name.to_string(),
        }
    }

    /// Record an outbound ping. An older unanswered ping keeps its deadline.
    pub fn ping_sent(&mut self) {
        if self.awaiting_pong_since.is_none() {
            self.awaiting_pong_since = Some(Instant::now());
        }
    }

    pub fn pong_received(&mut self) {
        self.awaiting_pong_since = None;
    }

    /// When the outstanding ping expires, if one is outstanding.
    pub fn deadline(&self) -> Option<Instant> {
        self.awaiting_pong_since.map(|since| since + self.timeout)
    }

    /// Resolves once the outstanding ping hits its deadline.
    /// Never resolves while no ping is outstanding.
    pub async fn expired(&self) {
        match self.deadline() {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                debug!(
                    "KeepaliveMonitor[{}]: no pong within {:?}",
                    self.name, self.timeout
                );
            }
            None => std::future::pending().await,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

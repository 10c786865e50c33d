use std::time::Duration;

/// Decides how long to wait before reconnect attempt `attempt` (1-based).
pub trait ReconnectPolicy: Send + Sync {
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Same delay before every attempt
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_ignores_attempt() {
        let policy = FixedDelay::default();
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(50), Duration::from_secs(2));
    }
}

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

/// Lifecycle of the feed connection. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Subscribed,
    Streaming,
    Reconnecting,
}

/// Shared view of the current feed state.
///
/// Written by the supervisor and the active session, observable by anyone
/// holding a receiver.
#[derive(Clone)]
pub struct FeedStatus {
    tx: watch::Sender<FeedState>,
}

impl FeedStatus {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FeedState::Disconnected);
        Self { tx }
    }

    /// Record a transition. Repeated states are ignored.
    pub fn set(&self, state: FeedState) {
        let previous = *self.tx.borrow();
        if previous != state {
            info!("Feed: {:?} -> {:?}", previous, state);
            self.tx.send_replace(state);
        }
    }

    pub fn current(&self) -> FeedState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.tx.subscribe()
    }
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_starts_disconnected() {
        let status = FeedStatus::new();
        assert_eq!(status.current(), FeedState::Disconnected);
    }

    #[test]
    fn test_status_visible_to_receivers() {
        let status = FeedStatus::new();
        let rx = status.subscribe();
        status.set(FeedState::Connecting);
        status.set(FeedState::Subscribed);
        assert_eq!(*rx.borrow(), FeedState::Subscribed);
    }
}

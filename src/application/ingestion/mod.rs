pub mod feed_supervisor;
pub mod keepalive;
pub mod reconnect_policy;
pub mod replay_connector;

pub use feed_supervisor::FeedSupervisor;
pub use keepalive::KeepaliveMonitor;
pub use reconnect_policy::{FixedDelay, ReconnectPolicy};
pub use replay_connector::{ReplayBatch, ReplayConnector, ReplaySummary, load_replay_trades};

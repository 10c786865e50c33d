pub mod cache;
pub mod coinbase;
pub mod ml;
pub mod mock;
pub mod observability;
pub mod persistence;

pub use cache::InMemoryFeatureCache;
pub use coinbase::CoinbaseTradeFeed;
pub use ml::FileModelStore;
pub use persistence::{Database, SqliteTradeRepository};

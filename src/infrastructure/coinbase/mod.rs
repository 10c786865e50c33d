pub mod messages;
pub mod websocket;

pub use websocket::CoinbaseTradeFeed;

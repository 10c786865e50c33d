// Domain-specific error types
pub mod errors;

// Feed connection lifecycle
pub mod feed;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Trades, feature vectors, source modes
pub mod types;

pub mod model_provider;
pub mod scoring_service;

pub use model_provider::ModelProvider;
pub use scoring_service::{DemoData, ScoreResponse, ScoringService};

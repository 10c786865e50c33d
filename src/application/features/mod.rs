pub mod feature_engine;
pub mod materializer;

pub use feature_engine::compute_features;
pub use materializer::{FeatureMaterializer, MaterializeOutcome, MaterializerConfig};

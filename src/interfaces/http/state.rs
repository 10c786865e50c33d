use crate::application::scoring::ScoringService;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub scoring: Arc<ScoringService>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(scoring: Arc<ScoringService>, metrics: Metrics) -> Self {
        Self { scoring, metrics }
    }
}

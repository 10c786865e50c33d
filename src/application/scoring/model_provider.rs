use crate::domain::errors::ModelError;
use crate::domain::ports::{LoadedModel, ModelStore};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

pub const PRODUCTION_STAGE: &str = "Production";

/// Lazily loads the scoring model once per process.
///
/// The promoted `Production` version wins; otherwise the most recent run is
/// used. Concurrent first callers share one load. A failed load is not
/// remembered, so the next caller tries again.
pub struct ModelProvider {
    name: String,
    store: Arc<dyn ModelStore>,
    cell: OnceCell<LoadedModel>,
}

impl ModelProvider {
    pub fn new(name: &str, store: Arc<dyn ModelStore>) -> Self {
        Self {
            name: name.to_string(),
            store,
            cell: OnceCell::new(),
        }
    }

    /// The memoized model, loading it on first use.
    pub async fn get(&self) -> Result<&LoadedModel, ModelError> {
        self.cell.get_or_try_init(|| self.load()).await
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    async fn load(&self) -> Result<LoadedModel, ModelError> {
        match self.store.load_stage(&self.name, PRODUCTION_STAGE).await {
            Ok(Some(loaded)) => {
                info!(model = %loaded.label, "Model loaded");
                return Ok(loaded);
            }
            Ok(None) => info!(
                "No {} version of {}, falling back to latest run",
                PRODUCTION_STAGE, self.name
            ),
            Err(e) => warn!(
                "Loading {} from stage {} failed: {:#}; falling back to latest run",
                self.name, PRODUCTION_STAGE, e
            ),
        }

        match self.store.load_latest_run(&self.name).await {
            Ok(Some(loaded)) => {
                info!(model = %loaded.label, "Model loaded");
                Ok(loaded)
            }
            Ok(None) => Err(ModelError::Unavailable {
                name: self.name.clone(),
            }),
            Err(e) => {
                warn!("Loading latest run of {} failed: {:#}", self.name, e);
                Err(ModelError::Unavailable {
                    name: self.name.clone(),
                })
            }
        }
    }
}

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::domain::repositories::TradeRepository;
use crate::infrastructure::persistence::{Database, SqliteTradeRepository};

pub struct PersistenceHandle {
    pub db: Database,
    pub trade_repository: Arc<dyn TradeRepository>,
}

pub struct PersistenceBootstrap;

impl PersistenceBootstrap {
    pub async fn init(database_url: &str) -> Result<PersistenceHandle> {
        info!("Initializing Trade Store at {}", database_url);

        let db = Database::new(database_url)
            .await
            .context("Failed to initialize database")?;

        let trade_repository = Arc::new(SqliteTradeRepository::new(db.clone()));

        Ok(PersistenceHandle {
            db,
            trade_repository,
        })
    }
}

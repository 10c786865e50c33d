use crate::domain::repositories::TradeRepository;
use crate::domain::types::Trade;
use crate::infrastructure::persistence::database::Database;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

pub struct SqliteTradeRepository {
    database: Database,
}

impl SqliteTradeRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

fn row_to_trade((ts, price, size): (i64, f64, f64)) -> Option<Trade> {
    match DateTime::<Utc>::from_timestamp_micros(ts) {
        Some(timestamp) => Some(Trade::new(timestamp, price, size)),
        None => {
            warn!(ts, "Skipping trade row with out-of-range timestamp");
            None
        }
    }
}

#[async_trait]
impl TradeRepository for SqliteTradeRepository {
    async fn insert(&self, trade: &Trade) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO trades (ts, price, size)
            VALUES (?, ?, ?)
            ON CONFLICT(ts) DO NOTHING
            "#,
        )
        .bind(trade.timestamp.timestamp_micros())
        .bind(trade.price)
        .bind(trade.size)
        .execute(&self.database.pool)
        .await
        .context("Failed to insert trade")?;

        Ok(result.rows_affected() == 1)
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<Trade>> {
        let rows = sqlx::query_as::<_, (i64, f64, f64)>(
            "SELECT ts, price, size FROM trades WHERE ts > ? ORDER BY ts ASC",
        )
        .bind(since.timestamp_micros())
        .fetch_all(&self.database.pool)
        .await
        .context("Failed to load trade window")?;

        Ok(rows.into_iter().filter_map(row_to_trade).collect())
    }

    async fn all(&self) -> Result<Vec<Trade>> {
        let rows =
            sqlx::query_as::<_, (i64, f64, f64)>("SELECT ts, price, size FROM trades ORDER BY ts ASC")
                .fetch_all(&self.database.pool)
                .await
                .context("Failed to load trades")?;

        Ok(rows.into_iter().filter_map(row_to_trade).collect())
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades")
            .fetch_one(&self.database.pool)
            .await
            .context("Failed to count trades")?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn repo() -> SqliteTradeRepository {
        let db = Database::new("sqlite::memory:").await.unwrap();
        SqliteTradeRepository::new(db)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_is_absorbed() {
        let repo = repo().await;

        assert!(repo.insert(&Trade::new(at(0), 100.0, 0.5)).await.unwrap());
        assert!(!repo.insert(&Trade::new(at(0), 999.0, 9.0)).await.unwrap());

        let trades = repo.all().await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100.0);
        assert_eq!(trades[0].size, 0.5);
    }

    #[tokio::test]
    async fn test_reads_are_ordered_regardless_of_arrival() {
        let repo = repo().await;
        for secs in [5, 1, 3, 2, 4] {
            repo.insert(&Trade::new(at(secs), 100.0 + secs as f64, 0.1))
                .await
                .unwrap();
        }

        let trades = repo.all().await.unwrap();
        let prices: Vec<f64> = trades.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![101.0, 102.0, 103.0, 104.0, 105.0]);
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_since_is_exclusive_and_keeps_microseconds() {
        let repo = repo().await;
        let base = at(0);
        let fine = base + Duration::microseconds(250);
        repo.insert(&Trade::new(base, 1.0, 1.0)).await.unwrap();
        repo.insert(&Trade::new(fine, 2.0, 1.0)).await.unwrap();
        repo.insert(&Trade::new(at(10), 3.0, 1.0)).await.unwrap();

        let window = repo.since(base).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, fine);
        assert_eq!(window[1].price, 3.0);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/nested/trades.db", dir.path().display());

        {
            let repo = SqliteTradeRepository::new(Database::new(&url).await.unwrap());
            repo.insert(&Trade::new(at(1), 42.0, 0.01)).await.unwrap();
        }

        let repo = SqliteTradeRepository::new(Database::new(&url).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}

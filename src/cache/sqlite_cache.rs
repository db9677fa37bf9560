use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::error::Error;

use super::CacheSink;


/// SQLite-backed cache sink. Consumer hashes are stored as a JSON array so
/// the resume logic can read them back without a join table.
pub struct SqliteCacheSink {
    pub pool: Pool<Sqlite>,
}

impl SqliteCacheSink {
    pub async fn new(database_url: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        // A single connection: SQLite allows one writer, and pooled
        // ':memory:' URLs would otherwise open one database per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Fetch the consumer hashes recorded for a finalized task.
    pub async fn get(
        &self,
        task_hash: &str,
    ) -> Result<Option<Vec<String>>, Box<dyn Error + Send + Sync>> {
        let row = sqlx::query(
            r#"
            SELECT consumers
            FROM task_runs
            WHERE hash = ?
            "#,
        )
        .bind(task_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let json: String = row.get("consumers");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CacheSink for SqliteCacheSink {
    async fn init(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_runs (
                hash TEXT PRIMARY KEY,
                consumers TEXT,
                finalized_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize(
        &self,
        task_hash: &str,
        consumer_hashes: &[String],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let consumers = serde_json::to_string(consumer_hashes)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO task_runs (hash, consumers)
            VALUES (?, ?)
            "#,
        )
        .bind(task_hash)
        .bind(consumers)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

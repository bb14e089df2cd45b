//! Postgres storage backend: one row per collection in `kv_store`.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Storage, StorageResult};

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read '{}': {:?}", key, e);
                e
            })?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES ($1, $2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write '{}': {:?}", key, e);
            e
        })?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

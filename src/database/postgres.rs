use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};

use super::documents::{Document, DocumentStore};
use super::manager::DatabaseError;

/// Document store over the `documents` table, one row per (collection, id)
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, DatabaseError> {
        Ok(Document {
            id: row.try_get("id")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, id: &str, body: Value) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!("{}/{} already exists", collection, id)));
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let row = sqlx::query(
            "SELECT id, body, created_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT id, body, created_at FROM documents WHERE collection = $1
             ORDER BY created_at, id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), DatabaseError> {
        if !partial.is_object() {
            return Err(DatabaseError::InvalidDocument("partial update must be a JSON object".to_string()));
        }
        let result = sqlx::query(
            "UPDATE documents SET body = body || $3, updated_at = now()
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(&partial)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{}/{}", collection, id)));
        }
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        partial: Value,
    ) -> Result<bool, DatabaseError> {
        if !partial.is_object() {
            return Err(DatabaseError::InvalidDocument("partial update must be a JSON object".to_string()));
        }
        // Guard and write happen in one statement, so concurrent callers cannot both match
        let result = sqlx::query(
            "UPDATE documents SET body = body || $3, updated_at = now()
             WHERE collection = $1 AND id = $2 AND body -> $4 = $5",
        )
        .bind(collection)
        .bind(id)
        .bind(&partial)
        .bind(field)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, DatabaseError> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }

    async fn health(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

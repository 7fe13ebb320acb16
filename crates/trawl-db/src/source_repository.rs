use sqlx::{PgPool, Pool, Postgres};
use trawl_core::error::AppError;
use trawl_core::models::SourceConfig;
use uuid::Uuid;

/// Repository for the persisted source catalog.
#[derive(Clone)]
pub struct SourceRepository {
    pool: Pool<Postgres>,
}

impl SourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All catalog rows, ordered by id.
    pub async fn list(&self) -> Result<Vec<SourceConfig>, AppError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, seed_url FROM sources ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, seed_url)| SourceConfig { id, seed_url })
            .collect())
    }

    /// Insert a catalog row. An existing row with the same id is kept as is.
    pub async fn upsert(&self, source: &SourceConfig) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sources (id, seed_url)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&source.id)
        .bind(&source.seed_url)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Delete a source and every article it produced in one transaction.
    ///
    /// Returns the ids of the removed articles. An unknown id rolls back and
    /// yields `SourceNotFound`.
    pub async fn delete_cascade(&self, id: &str) -> Result<Vec<Uuid>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let articles: Vec<(Uuid,)> =
            sqlx::query_as("DELETE FROM articles WHERE source_id = $1 RETURNING id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let source: Option<(String,)> =
            sqlx::query_as("DELETE FROM sources WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if source.is_none() {
            tx.rollback()
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            return Err(AppError::SourceNotFound(id.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(source = %id, articles = articles.len(), "Cascade delete committed");
        Ok(articles.into_iter().map(|(id,)| id).collect())
    }
}

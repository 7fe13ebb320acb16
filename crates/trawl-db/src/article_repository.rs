use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use trawl_core::error::AppError;
use trawl_core::models::{Article, NewArticle};
use uuid::Uuid;

/// Repository for harvested articles.
#[derive(Clone)]
pub struct ArticleRepository {
    pool: Pool<Postgres>,
}

impl ArticleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Save a validated article. Returns the generated UUID.
    pub async fn save(&self, article: &NewArticle) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO articles (url, username, username_url, title, published_at, source_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&article.url)
        .bind(&article.username)
        .bind(&article.username_url)
        .bind(&article.title)
        .bind(article.published_at)
        .bind(&article.source_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.0)
    }

    /// Most recently stored articles, newest first.
    pub async fn list(&self, source_id: Option<&str>, limit: usize) -> Result<Vec<Article>, AppError> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, url, username, username_url, title, published_at, source_id, created_at
            FROM articles
            WHERE $1::VARCHAR IS NULL OR source_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(source_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count(&self, source_id: &str) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE source_id = $1")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.0)
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    url: String,
    username: String,
    username_url: String,
    title: String,
    published_at: DateTime<Utc>,
    source_id: String,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            url: row.url,
            username: row.username,
            username_url: row.username_url,
            title: row.title,
            published_at: row.published_at,
            source_id: row.source_id,
            created_at: row.created_at,
        }
    }
}

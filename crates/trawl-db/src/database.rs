use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use trawl_core::AppError;
use trawl_core::models::{Article, NewArticle, SourceConfig};
use trawl_core::traits::ArticleStore;
use uuid::Uuid;

use crate::article_repository::ArticleRepository;
use crate::config::DatabaseConfig;
use crate::source_repository::SourceRepository;

/// Central database facade: owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    pub fn source_repo(&self) -> SourceRepository {
        SourceRepository::new(self.pool.clone())
    }

    pub fn article_repo(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ArticleStore for Database {
    async fn write_record(&self, article: &NewArticle) -> Result<Uuid, AppError> {
        self.article_repo().save(article).await
    }

    async fn list_sources(&self) -> Result<Vec<SourceConfig>, AppError> {
        self.source_repo().list().await
    }

    async fn register_source(&self, source: &SourceConfig) -> Result<(), AppError> {
        self.source_repo().upsert(source).await
    }

    async fn delete_source(&self, id: &str) -> Result<Vec<Uuid>, AppError> {
        self.source_repo().delete_cascade(id).await
    }

    async fn list_articles(
        &self,
        source_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Article>, AppError> {
        self.article_repo().list(source_id, limit).await
    }
}

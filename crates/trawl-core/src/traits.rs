use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Article, ArticleRecord, NewArticle, SourceConfig};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Per-source page rules: turns a main page into article links and an
/// article page into a record.
///
/// Implementations are plain synchronous functions over already-fetched
/// HTML. They may panic on pages they do not understand; callers wrap every
/// invocation in a panic boundary.
pub trait SourceExtractor: Send + Sync {
    /// Candidate article URLs found on the source's main page.
    fn extract_links(&self, html: &str) -> Vec<String>;

    /// Whatever the article page yields. Missing elements leave fields empty.
    fn extract_record(&self, html: &str, url: &str) -> ArticleRecord;
}

/// Persists harvested articles and the source catalog.
pub trait ArticleStore: Send + Sync + Clone {
    /// Write one validated article. Returns the generated id.
    fn write_record(
        &self,
        article: &NewArticle,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    /// Every source in the persisted catalog.
    fn list_sources(&self) -> impl Future<Output = Result<Vec<SourceConfig>, AppError>> + Send;

    /// Add a source to the catalog. Existing rows are left untouched.
    fn register_source(
        &self,
        source: &SourceConfig,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Remove a source's catalog row together with all of its articles.
    ///
    /// Must be atomic: either both are gone or neither is. Returns the ids
    /// of the deleted articles.
    fn delete_source(&self, id: &str)
    -> impl Future<Output = Result<Vec<Uuid>, AppError>> + Send;

    /// Most recent articles, optionally restricted to one source.
    fn list_articles(
        &self,
        source_id: Option<&str>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Article>, AppError>> + Send;
}

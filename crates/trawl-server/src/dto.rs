use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trawl_core::models::Article;
use trawl_core::scheduler::SourceStatus;
use trawl_core::util::format_duration;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceResponse {
    pub id: String,
    pub seed_url: String,
    /// `active` or `paused`.
    pub state: String,
    /// Poll interval, e.g. `"1h30m"`.
    pub interval: String,
    pub interval_secs: u64,
    /// Distinct article URLs dispatched since startup.
    pub dispatched: usize,
}

impl From<SourceStatus> for SourceResponse {
    fn from(status: SourceStatus) -> Self {
        Self {
            id: status.id,
            seed_url: status.seed_url,
            state: status.state.to_string(),
            interval: format_duration(status.interval),
            interval_secs: status.interval.as_secs(),
            dispatched: status.dispatched,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceListResponse {
    pub sources: Vec<SourceResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct IntervalRequest {
    /// New poll interval, e.g. `"90s"`, `"5m"`, `"1h30m"`.
    pub interval: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeleteSourceResponse {
    pub id: String,
    pub deleted_articles: usize,
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListArticlesQuery {
    pub source: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub url: String,
    pub username: String,
    pub username_url: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub source_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Article> for ArticleResponse {
    fn from(a: Article) -> Self {
        Self {
            id: a.id,
            url: a.url,
            username: a.username,
            username_url: a.username_url,
            title: a.title,
            published_at: a.published_at,
            source_id: a.source_id,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub active_sources: usize,
    pub paused_sources: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

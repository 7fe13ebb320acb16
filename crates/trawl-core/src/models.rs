use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// A record as produced by a source extractor.
///
/// Extractors fill in whatever they find on the page, so any field may be
/// empty. Nothing is checked until the flush loop calls [`validate`](Self::validate).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub username: String,
    /// Link to the author's profile page.
    pub username_url: String,
    pub title: String,
    /// Canonical article URL.
    pub url: String,
    /// Publish timestamp as found on the page (RFC 3339).
    pub published_at: String,
    pub source_id: String,
}

impl ArticleRecord {
    /// A record carrying only its origin, used when fetching or extracting
    /// the article failed. It never passes validation.
    pub fn partial(url: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_id: source_id.into(),
            ..Self::default()
        }
    }

    /// Check that every field is present and the timestamp parses.
    ///
    /// Values are trimmed before the check, so whitespace-only fields count
    /// as empty.
    pub fn validate(&self) -> Result<NewArticle, AppError> {
        let url = required(&self.url, "url")?;
        let title = required(&self.title, "title")?;
        let username = required(&self.username, "username")?;
        let username_url = required(&self.username_url, "username_url")?;
        let published_raw = required(&self.published_at, "published_at")?;
        let source_id = required(&self.source_id, "source_id")?;

        let published_at = DateTime::parse_from_rfc3339(published_raw)
            .map_err(|e| {
                AppError::ValidationError(format!(
                    "published_at '{published_raw}' is not RFC 3339: {e}"
                ))
            })?
            .with_timezone(&Utc);

        Ok(NewArticle {
            url: url.to_string(),
            username: username.to_string(),
            username_url: username_url.to_string(),
            title: title.to_string(),
            published_at,
            source_id: source_id.to_string(),
        })
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is empty")));
    }
    Ok(trimmed)
}

/// A validated record, ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewArticle {
    pub url: String,
    pub username: String,
    pub username_url: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub source_id: String,
}

/// A persisted article.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: Uuid,
    pub url: String,
    pub username: String,
    pub username_url: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub source_id: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the persisted source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub seed_url: String,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, seed_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            seed_url: seed_url.into(),
        }
    }
}

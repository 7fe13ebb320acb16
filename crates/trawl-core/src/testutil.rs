//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::ArticleJob;
use crate::models::{Article, ArticleRecord, NewArticle, SourceConfig};
use crate::queue::JobReceiver;
use crate::traits::{ArticleStore, Fetcher, SourceExtractor};
use crate::worker::{WorkerEvent, WorkerReporter};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving canned pages by URL.
///
/// Unknown URLs fail with an HTTP 404 error.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.set_page(url, html);
        self
    }

    /// Every fetch of `url` fails with a network error.
    pub fn with_failure(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    /// Every fetch takes `delay` of (Tokio) time before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(url) {
            return Err(AppError::NetworkError(format!("Connection failed: {url}")));
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

// ---------------------------------------------------------------------------
// StaticExtractor
// ---------------------------------------------------------------------------

/// Extractor that ignores the HTML and returns configured data.
///
/// `extract_links` yields the configured link list; `extract_record` yields
/// the configured record for a URL, or a complete record built by
/// [`make_test_record`] if none was configured.
#[derive(Clone, Default)]
pub struct StaticExtractor {
    links: Arc<Mutex<Vec<String>>>,
    records: Arc<Mutex<HashMap<String, ArticleRecord>>>,
    panicking: Arc<Mutex<HashSet<String>>>,
    panic_on_links: Arc<Mutex<bool>>,
}

impl StaticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(self, links: &[&str]) -> Self {
        self.set_links(links);
        self
    }

    pub fn with_record(self, record: ArticleRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.url.clone(), record);
        self
    }

    /// `extract_record` panics for this URL.
    pub fn panicking_on(self, url: &str) -> Self {
        self.panicking.lock().unwrap().insert(url.to_string());
        self
    }

    /// `extract_links` panics on every call.
    pub fn panicking_on_links(self) -> Self {
        *self.panic_on_links.lock().unwrap() = true;
        self
    }

    pub fn set_links(&self, links: &[&str]) {
        *self.links.lock().unwrap() = links.iter().map(|l| l.to_string()).collect();
    }
}

impl SourceExtractor for StaticExtractor {
    fn extract_links(&self, _html: &str) -> Vec<String> {
        if *self.panic_on_links.lock().unwrap() {
            panic!("main page layout changed");
        }
        self.links.lock().unwrap().clone()
    }

    fn extract_record(&self, _html: &str, url: &str) -> ArticleRecord {
        if self.panicking.lock().unwrap().contains(url) {
            panic!("expected element missing on {url}");
        }
        self.records
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| make_test_record(url, ""))
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// Mock store that records writes and keeps an in-memory catalog.
#[derive(Clone, Default)]
pub struct MockStore {
    written: Arc<Mutex<Vec<(Uuid, NewArticle)>>>,
    sources: Arc<Mutex<Vec<SourceConfig>>>,
    failing_writes: Arc<Mutex<HashSet<String>>>,
    delete_error: Arc<Mutex<Option<String>>>,
    pub deleted_sources: Arc<Mutex<Vec<String>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: Vec<SourceConfig>) -> Self {
        let store = Self::default();
        *store.sources.lock().unwrap() = sources;
        store
    }

    /// Writing an article with this URL fails.
    pub fn with_write_failure(self, url: &str) -> Self {
        self.failing_writes.lock().unwrap().insert(url.to_string());
        self
    }

    /// Every `delete_source` call fails with this message, leaving data intact.
    pub fn with_delete_error(self, message: &str) -> Self {
        *self.delete_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn written(&self) -> Vec<NewArticle> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn written_urls(&self) -> Vec<String> {
        self.written().into_iter().map(|a| a.url).collect()
    }

    pub fn catalog(&self) -> Vec<SourceConfig> {
        self.sources.lock().unwrap().clone()
    }
}

impl ArticleStore for MockStore {
    async fn write_record(&self, article: &NewArticle) -> Result<Uuid, AppError> {
        if self.failing_writes.lock().unwrap().contains(&article.url) {
            return Err(AppError::DatabaseError(format!(
                "insert failed for {}",
                article.url
            )));
        }
        let id = Uuid::new_v4();
        self.written.lock().unwrap().push((id, article.clone()));
        Ok(id)
    }

    async fn list_sources(&self) -> Result<Vec<SourceConfig>, AppError> {
        Ok(self.sources.lock().unwrap().clone())
    }

    async fn register_source(&self, source: &SourceConfig) -> Result<(), AppError> {
        let mut sources = self.sources.lock().unwrap();
        if !sources.iter().any(|s| s.id == source.id) {
            sources.push(source.clone());
        }
        Ok(())
    }

    async fn delete_source(&self, id: &str) -> Result<Vec<Uuid>, AppError> {
        if let Some(message) = self.delete_error.lock().unwrap().clone() {
            return Err(AppError::DatabaseError(message));
        }

        let mut sources = self.sources.lock().unwrap();
        let before = sources.len();
        sources.retain(|s| s.id != id);
        if sources.len() == before {
            return Err(AppError::SourceNotFound(id.to_string()));
        }

        let mut written = self.written.lock().unwrap();
        let ids = written
            .iter()
            .filter(|(_, a)| a.source_id == id)
            .map(|(id, _)| *id)
            .collect();
        written.retain(|(_, a)| a.source_id != id);
        self.deleted_sources.lock().unwrap().push(id.to_string());
        Ok(ids)
    }

    async fn list_articles(
        &self,
        source_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Article>, AppError> {
        let written = self.written.lock().unwrap();
        Ok(written
            .iter()
            .rev()
            .filter(|(_, a)| source_id.is_none_or(|s| a.source_id == s))
            .take(limit)
            .map(|(id, a)| Article {
                id: *id,
                url: a.url.clone(),
                username: a.username.clone(),
                username_url: a.username_url.clone(),
                title: a.title.clone(),
                published_at: a.published_at,
                source_id: a.source_id.clone(),
                created_at: Utc::now(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock worker reporter that records events.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, label: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == label)
            .count()
    }
}

impl WorkerReporter for MockReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        let label = match &event {
            WorkerEvent::Started { .. } => "Started",
            WorkerEvent::JobReceived { .. } => "JobReceived",
            WorkerEvent::JobDiscarded { .. } => "JobDiscarded",
            WorkerEvent::RecordBuffered { .. } => "RecordBuffered",
            WorkerEvent::ExtractionFailed { .. } => "ExtractionFailed",
            WorkerEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A record that passes validation.
pub fn make_test_record(url: &str, source_id: &str) -> ArticleRecord {
    ArticleRecord {
        username: "alice".to_string(),
        username_url: "https://example.com/users/alice".to_string(),
        title: format!("Article at {url}"),
        url: url.to_string(),
        published_at: "2024-05-01T08:00:00Z".to_string(),
        source_id: source_id.to_string(),
    }
}

/// Pull every job currently queued, waiting briefly for stragglers.
pub async fn drain_jobs(rx: &JobReceiver) -> Vec<ArticleJob> {
    let mut jobs = Vec::new();
    while let Ok(Some(job)) = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await {
        jobs.push(job);
    }
    jobs
}

//! Static mapping from source id to its extraction capability.
//!
//! A source is nothing more than an id, a seed URL and a [`SourceExtractor`].
//! Adding a new one means registering that triple; the scheduler and the
//! worker pool never look at the concrete extractor type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::AppError;
use crate::models::SourceConfig;
use crate::traits::SourceExtractor;

/// Everything the engine needs to harvest one source.
#[derive(Clone)]
pub struct SourcePlugin {
    pub seed_url: String,
    pub extractor: Arc<dyn SourceExtractor>,
}

impl fmt::Debug for SourcePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePlugin")
            .field("seed_url", &self.seed_url)
            .finish_non_exhaustive()
    }
}

/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    plugins: HashMap<String, SourcePlugin>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. Fails on a duplicate id or a seed URL that is not an
    /// absolute URL.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        seed_url: impl Into<String>,
        extractor: Arc<dyn SourceExtractor>,
    ) -> Result<(), AppError> {
        let id = id.into();
        let seed_url = seed_url.into();

        if id.trim().is_empty() {
            return Err(AppError::ConfigError("source id must not be empty".into()));
        }
        Url::parse(&seed_url).map_err(|e| {
            AppError::ConfigError(format!("invalid seed URL '{seed_url}' for {id}: {e}"))
        })?;
        if self.plugins.contains_key(&id) {
            return Err(AppError::ConfigError(format!(
                "source '{id}' is already registered"
            )));
        }

        self.plugins.insert(
            id,
            SourcePlugin {
                seed_url,
                extractor,
            },
        );
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_source(
        mut self,
        id: impl Into<String>,
        seed_url: impl Into<String>,
        extractor: Arc<dyn SourceExtractor>,
    ) -> Result<Self, AppError> {
        self.register(id, seed_url, extractor)?;
        Ok(self)
    }

    pub fn lookup(&self, id: &str) -> Result<&SourcePlugin, AppError> {
        self.plugins
            .get(id)
            .ok_or_else(|| AppError::SourceNotFound(id.to_string()))
    }

    /// Catalog rows for every registered source, sorted by id.
    pub fn catalog(&self) -> Vec<SourceConfig> {
        let mut rows: Vec<_> = self
            .plugins
            .iter()
            .map(|(id, plugin)| SourceConfig::new(id.clone(), plugin.seed_url.clone()))
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

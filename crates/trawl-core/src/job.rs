use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::traits::SourceExtractor;

/// Lifecycle state of a source scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Active,
    Paused,
    Retired,
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceState::Active => "active",
            SourceState::Paused => "paused",
            SourceState::Retired => "retired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SourceState::Retired)
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SourceState::Active),
            "paused" => Ok(SourceState::Paused),
            "retired" => Ok(SourceState::Retired),
            _ => Err(format!("Unknown source state: {}", s)),
        }
    }
}

/// One article page waiting for extraction.
///
/// Carries what a worker needs from its owning source: the id to stamp on
/// the record, the extractor, and the source's cancellation token so jobs of
/// a deleted source can be dropped unprocessed.
#[derive(Clone)]
pub struct ArticleJob {
    pub url: String,
    pub source_id: String,
    pub extractor: Arc<dyn SourceExtractor>,
    pub cancel: CancellationToken,
}

impl ArticleJob {
    pub fn is_retired(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for ArticleJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleJob")
            .field("url", &self.url)
            .field("source_id", &self.source_id)
            .field("retired", &self.is_retired())
            .finish()
    }
}

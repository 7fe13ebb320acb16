pub mod buffer;
pub mod config;
pub mod error;
pub mod harvester;
pub mod job;
pub mod models;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod traits;
pub mod util;
pub mod worker;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use buffer::{FlushLoop, FlushReport, ResultBuffer};
pub use config::HarvestConfig;
pub use error::AppError;
pub use harvester::Harvester;
pub use job::{ArticleJob, SourceState};
pub use models::{Article, ArticleRecord, NewArticle, SourceConfig};
pub use registry::{ExtractorRegistry, SourcePlugin};
pub use scheduler::{SourceScheduler, SourceStatus};
pub use traits::{ArticleStore, Fetcher, SourceExtractor};
pub use util::{MAX_INTERVAL, format_duration, parse_duration};

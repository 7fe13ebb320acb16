pub mod extractors;
pub mod fetcher;

pub use extractors::{SelectorExtractor, SelectorRules, default_registry};
pub use fetcher::ReqwestFetcher;

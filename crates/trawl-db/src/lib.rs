pub mod article_repository;
pub mod config;
pub mod database;
pub mod source_repository;

pub use article_repository::ArticleRepository;
pub use config::DatabaseConfig;
pub use database::Database;
pub use source_repository::SourceRepository;

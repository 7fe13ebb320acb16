use std::sync::Arc;

use trawl_client::ReqwestFetcher;
use trawl_core::Harvester;
use trawl_db::Database;

/// The engine as wired in production.
pub type ServerHarvester = Harvester<ReqwestFetcher, Database>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub harvester: Arc<ServerHarvester>,
    pub db: Database,
    /// Bearer token required on every `/v1` route.
    pub api_key: String,
}

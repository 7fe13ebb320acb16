use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use trawl_client::{ReqwestFetcher, default_registry};
use trawl_core::{HarvestConfig, Harvester};
use trawl_db::{Database, DatabaseConfig};
use trawl_server::routes;
use trawl_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trawl=info".parse()?))
        .with_target(false)
        .init();

    let api_key = std::env::var("TRAWL_API_KEY").context("TRAWL_API_KEY must be set")?;
    let port = std::env::var("TRAWL_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let harvester = Arc::new(Harvester::new(
        ReqwestFetcher::new()?,
        db.clone(),
        Arc::new(default_registry()?),
        HarvestConfig::from_env()?,
    ));
    harvester.start().await?;

    let state = Arc::new(AppState {
        harvester: Arc::clone(&harvester),
        db,
        api_key,
    });

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(16 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    harvester.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use trawl_core::job::SourceState;
use trawl_core::traits::ArticleStore;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_api_key;
use crate::dto::{
    ArticleListResponse, ArticleResponse, DeleteSourceResponse, HealthResponse, IntervalRequest,
    ListArticlesQuery, SourceListResponse, SourceResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/sources", get(list_sources))
        .route("/v1/sources/{id}", get(get_source).delete(delete_source))
        .route("/v1/sources/{id}/stop", post(stop_source))
        .route("/v1/sources/{id}/start", post(start_source))
        .route("/v1/sources/{id}/interval", put(change_interval))
        .route("/v1/articles", get(list_articles))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/sources",
    responses(
        (status = 200, description = "Live sources", body = SourceListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn list_sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sources: Vec<SourceResponse> = state
        .harvester
        .sources()
        .await
        .into_iter()
        .map(SourceResponse::from)
        .collect();
    let total = sources.len();

    axum::Json(SourceListResponse { sources, total })
}

#[utoipa::path(
    get,
    path = "/v1/sources/{id}",
    params(
        ("id" = String, Path, description = "Source ID")
    ),
    responses(
        (status = 200, description = "Source details", body = SourceResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn get_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.harvester.source(&id).await?;
    Ok(axum::Json(SourceResponse::from(status)))
}

#[utoipa::path(
    post,
    path = "/v1/sources/{id}/stop",
    params(
        ("id" = String, Path, description = "Source ID")
    ),
    responses(
        (status = 204, description = "Source paused"),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn stop_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.harvester.stop(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/sources/{id}/start",
    params(
        ("id" = String, Path, description = "Source ID")
    ),
    responses(
        (status = 204, description = "Source resumed"),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 409, description = "Source already active", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn start_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.harvester.resume(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/v1/sources/{id}/interval",
    params(
        ("id" = String, Path, description = "Source ID")
    ),
    request_body = IntervalRequest,
    responses(
        (status = 204, description = "Interval changed"),
        (status = 400, description = "Invalid duration", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn change_interval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<IntervalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.harvester.set_interval(&id, &body.interval).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/sources/{id}",
    params(
        ("id" = String, Path, description = "Source ID")
    ),
    responses(
        (status = 200, description = "Source and its articles deleted", body = DeleteSourceResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 500, description = "Storage failure, source kept", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn delete_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.harvester.delete(&id).await?;
    Ok(axum::Json(DeleteSourceResponse {
        id,
        deleted_articles: deleted.len(),
    }))
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/articles",
    params(ListArticlesQuery),
    responses(
        (status = 200, description = "Stored articles, newest first", body = ArticleListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "articles"
)]
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(20).min(100);
    let articles = state
        .db
        .list_articles(query.source.as_deref(), limit)
        .await?;
    let total = articles.len();

    let response = ArticleListResponse {
        articles: articles.into_iter().map(ArticleResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = state.db.article_repo().health_check().await.is_ok();

    let sources = state.harvester.sources().await;
    let count = |wanted: SourceState| sources.iter().filter(|s| s.state == wanted).count();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if db_ok { "healthy" } else { "unhealthy" },
        database: if db_ok { "ok" } else { "error" },
        active_sources: count(SourceState::Active),
        paused_sources: count(SourceState::Paused),
    };

    (status, axum::Json(response))
}

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::dto::ErrorResponse;
use crate::state::AppState;

/// Guards the control plane: every `/v1` call must carry
/// `Authorization: Bearer <TRAWL_API_KEY>`.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match bearer_token(request.headers()) {
        Some(token) if key_matches(token, &state.api_key) => next.run(request).await,
        _ => {
            tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
            let body = ErrorResponse {
                error: "unauthorized".to_string(),
                message: "Control plane requires 'Authorization: Bearer <api_key>'".to_string(),
            };
            (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn key_matches(token: &str, api_key: &str) -> bool {
    token.as_bytes().ct_eq(api_key.as_bytes()).into()
}

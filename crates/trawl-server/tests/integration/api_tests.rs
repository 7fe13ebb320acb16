use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use trawl_core::models::NewArticle;
use trawl_core::traits::ArticleStore;

use crate::common::setup_test_app;

fn article(url: &str, source_id: &str) -> NewArticle {
    NewArticle {
        url: url.into(),
        username: "alice".into(),
        username_url: "https://habr.com/ru/users/alice/".into(),
        title: "Harvesting in Rust".into(),
        published_at: "2024-05-01T08:00:00Z".parse().unwrap(),
        source_id: source_id.into(),
    }
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
    assert_eq!(json["active_sources"], 2);
    assert_eq!(json["paused_sources"], 0);
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/v1/sources").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/sources")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_sources_shows_builtin_sources() {
    let app = setup_test_app().await;

    let (status, json) = app.call("GET", "/v1/sources", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["sources"][0]["id"], "habr");
    assert_eq!(json["sources"][0]["state"], "active");
    assert_eq!(json["sources"][0]["interval"], "1h");
    assert_eq!(json["sources"][1]["id"], "skillbox");
}

#[tokio::test]
async fn stop_and_start_source() {
    let app = setup_test_app().await;

    let (status, json) = app.call("POST", "/v1/sources/habr/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "already_active");

    let (status, _) = app.call("POST", "/v1/sources/habr/stop", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = app.call("GET", "/v1/sources/habr", None).await;
    assert_eq!(json["state"], "paused");

    // Stopping twice is fine.
    let (status, _) = app.call("POST", "/v1/sources/habr/stop", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call("POST", "/v1/sources/habr/start", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = app.call("GET", "/v1/sources/habr", None).await;
    assert_eq!(json["state"], "active");
}

#[tokio::test]
async fn unknown_source_returns_404() {
    let app = setup_test_app().await;

    for (method, uri) in [
        ("GET", "/v1/sources/nope"),
        ("POST", "/v1/sources/nope/stop"),
        ("POST", "/v1/sources/nope/start"),
        ("DELETE", "/v1/sources/nope"),
    ] {
        let (status, json) = app.call(method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(json["error"], "not_found");
    }
}

#[tokio::test]
async fn change_interval() {
    let app = setup_test_app().await;

    let (status, _) = app
        .call(
            "PUT",
            "/v1/sources/skillbox/interval",
            Some(serde_json::json!({"interval": "1h30m"})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = app.call("GET", "/v1/sources/skillbox", None).await;
    assert_eq!(json["interval"], "1h30m");
    assert_eq!(json["interval_secs"], 5400);
}

#[tokio::test]
async fn invalid_interval_returns_400_and_keeps_interval() {
    let app = setup_test_app().await;

    let (status, json) = app
        .call(
            "PUT",
            "/v1/sources/skillbox/interval",
            Some(serde_json::json!({"interval": "soon"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_duration");

    let (_, json) = app.call("GET", "/v1/sources/skillbox", None).await;
    assert_eq!(json["interval"], "1h");
}

#[tokio::test]
async fn delete_source_cascades() {
    let app = setup_test_app().await;
    app.db
        .write_record(&article("https://habr.com/ru/articles/1/", "habr"))
        .await
        .unwrap();
    app.db
        .write_record(&article("https://habr.com/ru/articles/2/", "habr"))
        .await
        .unwrap();

    let (status, json) = app.call("DELETE", "/v1/sources/habr", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted_articles"], 2);

    let (_, json) = app.call("GET", "/v1/sources", None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["sources"][0]["id"], "skillbox");

    let catalog = app.db.list_sources().await.unwrap();
    assert!(catalog.iter().all(|s| s.id != "habr"));

    let (status, _) = app.call("POST", "/v1/sources/habr/stop", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_articles_filters_by_source() {
    let app = setup_test_app().await;
    app.db
        .write_record(&article("https://habr.com/ru/articles/1/", "habr"))
        .await
        .unwrap();
    app.db
        .write_record(&article("https://skillbox.ru/media/code/1/", "skillbox"))
        .await
        .unwrap();

    let (status, json) = app.call("GET", "/v1/articles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);

    let (_, json) = app.call("GET", "/v1/articles?source=skillbox&limit=5", None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["articles"][0]["url"], "https://skillbox.ru/media/code/1/");
    assert_eq!(json["articles"][0]["username"], "alice");

    app.harvester.shutdown().await;
}

#[tokio::test]
async fn openapi_document_lists_source_routes() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/v1/sources/{id}/interval"].is_object());
    assert!(json["paths"]["/v1/sources/{id}/stop"].is_object());
}

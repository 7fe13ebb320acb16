use trawl_core::AppError;
use trawl_core::models::SourceConfig;
use trawl_core::traits::ArticleStore;

use crate::common::{article, setup_test_db};

#[tokio::test]
async fn upsert_is_idempotent_and_keeps_seed_url() {
    let (db, _container) = setup_test_db().await;
    let repo = db.source_repo();

    repo.upsert(&SourceConfig::new("habr", "https://habr.com/ru/articles/"))
        .await
        .unwrap();
    repo.upsert(&SourceConfig::new("habr", "https://habr.com/en/articles/"))
        .await
        .unwrap();
    repo.upsert(&SourceConfig::new("skillbox", "https://skillbox.ru/media/"))
        .await
        .unwrap();

    let sources = repo.list().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, "habr");
    assert_eq!(sources[0].seed_url, "https://habr.com/ru/articles/");
    assert_eq!(sources[1].id, "skillbox");
}

#[tokio::test]
async fn delete_cascade_removes_source_and_articles() {
    let (db, _container) = setup_test_db().await;
    db.register_source(&SourceConfig::new("habr", "https://habr.com/ru/articles/"))
        .await
        .unwrap();
    db.register_source(&SourceConfig::new("skillbox", "https://skillbox.ru/media/"))
        .await
        .unwrap();

    let a = db.write_record(&article("https://habr.com/1", "habr")).await.unwrap();
    let b = db.write_record(&article("https://habr.com/2", "habr")).await.unwrap();
    db.write_record(&article("https://skillbox.ru/1", "skillbox"))
        .await
        .unwrap();

    let mut deleted = db.delete_source("habr").await.unwrap();
    deleted.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(deleted, expected);

    let sources = db.list_sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].id, "skillbox");
    assert_eq!(db.article_repo().count("habr").await.unwrap(), 0);
    assert_eq!(db.article_repo().count("skillbox").await.unwrap(), 1);
}

#[tokio::test]
async fn delete_unknown_source_is_not_found() {
    let (db, _container) = setup_test_db().await;

    let err = db.delete_source("nope").await.unwrap_err();
    assert!(matches!(err, AppError::SourceNotFound(ref id) if id == "nope"));
}

#[tokio::test]
async fn article_for_unknown_source_is_rejected() {
    let (db, _container) = setup_test_db().await;

    let err = db
        .write_record(&article("https://habr.com/1", "ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
}

use trawl_core::models::SourceConfig;
use trawl_core::traits::ArticleStore;

use crate::common::{article, setup_test_db};

#[tokio::test]
async fn save_and_list_articles() {
    let (db, _container) = setup_test_db().await;
    db.register_source(&SourceConfig::new("habr", "https://habr.com/ru/articles/"))
        .await
        .unwrap();

    let id = db
        .write_record(&article("https://habr.com/ru/articles/1/", "habr"))
        .await
        .unwrap();
    assert!(!id.is_nil());

    let articles = db.list_articles(None, 10).await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, id);
    assert_eq!(articles[0].url, "https://habr.com/ru/articles/1/");
    assert_eq!(articles[0].username, "alice");
    assert_eq!(articles[0].source_id, "habr");
    assert_eq!(
        articles[0].published_at.to_rfc3339(),
        "2024-05-01T08:00:00+00:00"
    );
}

#[tokio::test]
async fn list_filters_by_source_and_limits() {
    let (db, _container) = setup_test_db().await;
    for (id, seed) in [
        ("habr", "https://habr.com/ru/articles/"),
        ("skillbox", "https://skillbox.ru/media/"),
    ] {
        db.register_source(&SourceConfig::new(id, seed)).await.unwrap();
    }

    for i in 0..3 {
        db.write_record(&article(&format!("https://habr.com/{i}"), "habr"))
            .await
            .unwrap();
    }
    db.write_record(&article("https://skillbox.ru/1", "skillbox"))
        .await
        .unwrap();

    assert_eq!(db.list_articles(None, 100).await.unwrap().len(), 4);
    assert_eq!(db.list_articles(Some("habr"), 100).await.unwrap().len(), 3);
    assert_eq!(db.list_articles(Some("habr"), 2).await.unwrap().len(), 2);

    let skillbox = db.list_articles(Some("skillbox"), 100).await.unwrap();
    assert_eq!(skillbox.len(), 1);
    assert_eq!(skillbox[0].url, "https://skillbox.ru/1");
}

#[tokio::test]
async fn health_check_succeeds() {
    let (db, _container) = setup_test_db().await;
    db.article_repo().health_check().await.unwrap();
}

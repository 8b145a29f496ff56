//! Legacy tag migration tests.
//!
//! Tests verify:
//! - Scalar tag strings are split into arrays
//! - A dry run reports without writing
//! - Migrated records become filterable in the gallery

use tower::ServiceExt;

use webpics::gallery::migrate_scalar_tags;

use super::test_utils::{body_text, card_count, get_request, photo, TestApp};

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let app = TestApp::new();
    app.store
        .seed_scalar_photo(photo("old", &[], 0), "sunset, city")
        .await;

    let report = migrate_scalar_tags(app.store.as_ref(), true).await.unwrap();
    assert_eq!(report.rewrites.len(), 1);
    assert_eq!(
        report.rewrites[0].after,
        vec!["sunset".to_string(), "city".to_string()]
    );
    assert_eq!(report.updated(), 0);
    assert!(app.store.photos().await[0].tags.is_empty());
}

#[tokio::test]
async fn test_migrated_records_are_filterable() {
    let app = TestApp::new();
    app.store
        .seed_scalar_photo(photo("old", &[], 0), "sunset, city")
        .await;
    app.store.seed_photo(photo("new", &["city"], 1)).await;

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=sunset", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 0);

    let report = migrate_scalar_tags(app.store.as_ref(), false).await.unwrap();
    assert_eq!(report.updated(), 1);

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=sunset&tags=city", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 1);
    assert!(html.contains("old.png"));

    // A second run finds nothing left to rewrite
    let report = migrate_scalar_tags(app.store.as_ref(), false).await.unwrap();
    assert!(report.rewrites.is_empty());
}

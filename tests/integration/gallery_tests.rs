//! Gallery listing integration tests.
//!
//! Tests verify:
//! - Newest-first ordering and pagination with page clamping
//! - AND tag filtering and active filter markers
//! - Empty-state rendering

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_utils::{body_text, card_count, get_request, photo, TestApp};

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_gallery_paginates_newest_first() {
    let app = TestApp::with_page_size(2);
    for (i, hash) in ["h1", "h2", "h3", "h4", "h5"].iter().enumerate() {
        app.store.seed_photo(photo(hash, &["city"], i as i64)).await;
    }

    let response = app.router.clone().oneshot(get_request("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert_eq!(card_count(&html), 2);
    assert!(html.contains("Page 1 of 3"));
    let newest = html.find("h5.png").unwrap();
    let second = html.find("h4.png").unwrap();
    assert!(newest < second);
    assert!(!html.contains("h3.png"));
    assert!(html.contains(r#"rel="next""#));
    assert!(!html.contains(r#"rel="prev""#));

    let response = app
        .router
        .clone()
        .oneshot(get_request("/?page=3", None))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert_eq!(card_count(&html), 1);
    assert!(html.contains("h1.png"));
    assert!(html.contains("Page 3 of 3"));
    assert!(html.contains(r#"rel="prev""#));
    assert!(!html.contains(r#"rel="next""#));
}

#[tokio::test]
async fn test_gallery_clamps_out_of_range_pages() {
    let app = TestApp::with_page_size(2);
    for (i, hash) in ["h1", "h2", "h3"].iter().enumerate() {
        app.store.seed_photo(photo(hash, &[], i as i64)).await;
    }

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?page=99", None))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("Page 2 of 2"));
    assert!(html.contains("h1.png"));

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?page=abc", None))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("Page 1 of 2"));
    assert!(html.contains("h3.png"));
}

// =============================================================================
// Tag Filtering
// =============================================================================

#[tokio::test]
async fn test_gallery_filters_with_all_tags() {
    let app = TestApp::new();
    app.store
        .seed_photo(photo("both", &["sunset", "city"], 0))
        .await;
    app.store.seed_photo(photo("sunset-only", &["sunset"], 1)).await;
    app.store.seed_photo(photo("city-only", &["city"], 2)).await;

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=sunset", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 2);
    assert!(!html.contains("city-only.png"));

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=sunset&tags=city", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 1);
    assert!(html.contains("both.png"));
    assert!(html.contains(r#"class="active""#));

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=sunset%2Ccity", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 1);
}

#[tokio::test]
async fn test_gallery_unmatched_filter_shows_empty_state() {
    let app = TestApp::new();
    app.store.seed_photo(photo("h1", &["city"], 0)).await;

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=nature", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 0);
    assert!(html.contains("No photos found."));
    assert!(html.contains("Page 1 of 0"));
}

#[tokio::test]
async fn test_gallery_empty_store() {
    let app = TestApp::new();
    let response = app.router.clone().oneshot(get_request("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("No photos found."));
    // Every vocabulary tag is offered as a filter
    for tag in ["sunset", "portrait", "city", "nature"] {
        assert!(html.contains(&format!(">{}</a>", tag)));
    }
}

// =============================================================================
// Viewing and Downloading
// =============================================================================

#[tokio::test]
async fn test_gallery_cards_link_full_image_and_download() {
    let app = TestApp::new();
    let record = photo("h1", &["city"], 0);
    app.store.seed_photo(record.clone()).await;

    let html = body_text(app.router.clone().oneshot(get_request("/", None)).await.unwrap()).await;

    assert_eq!(card_count(&html), 1);
    assert!(html.contains(&format!(r##"href="#view-{}""##, record.id)));
    assert!(html.contains(&format!(r#"id="view-{}" class="lightbox""#, record.id)));
    assert!(html.contains(&format!(
        r#"<a href="{}" class="download" download>"#,
        record.filepath
    )));
}

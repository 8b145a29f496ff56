//! Upload integration tests.
//!
//! Tests verify:
//! - A valid upload is stored, listed and filterable
//! - Re-uploading the same content hash is rejected with 409
//! - Missing files, missing hashes, unknown tags and non-images are rejected
//! - Signed-in uploads are attributed to the session user

use axum::http::{header, StatusCode};
use tower::ServiceExt;

use super::test_utils::{
    body_text, card_count, get_request, upload_request, Part, TestApp, PNG_BYTES, PUBLIC_BASE,
};

// =============================================================================
// Successful Uploads
// =============================================================================

#[tokio::test]
async fn test_upload_then_filter_then_duplicate() {
    let app = TestApp::new();

    let parts = [
        Part::File("photo", "beach.png", PNG_BYTES),
        Part::Text("hash", "abc123"),
        Part::Text("tags", "sunset"),
        Part::Text("uploader_name", "Alice"),
    ];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let photos = app.store.photos().await;
    assert_eq!(photos.len(), 1);
    let stored = &photos[0];
    assert_eq!(stored.file_hash, "abc123");
    assert_eq!(stored.tags, vec!["sunset".to_string()]);
    assert_eq!(stored.uploader_nickname, "Alice");
    assert_eq!(stored.upload_by, "anonymous");
    assert!(stored.filepath.starts_with(PUBLIC_BASE));
    assert!(stored.filepath.ends_with(".png"));

    let keys = app.blobs.keys().await;
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("webpics/beach-"));

    // Filtering on the uploaded tag keeps the card
    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=sunset", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 1);
    assert!(html.contains(&stored.filepath));
    assert!(html.contains("Alice"));

    // Filtering on another tag hides it
    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/?tags=portrait", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 0);

    // The same content hash cannot be stored twice
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let html = body_text(response).await;
    assert!(html.contains("abc123"));
    assert_eq!(app.store.photo_count().await, 1);
    assert_eq!(app.blobs.put_count(), 1);
}

#[tokio::test]
async fn test_upload_batch_with_multiple_files() {
    let app = TestApp::new();

    let parts = [
        Part::File("photo", "one.png", PNG_BYTES),
        Part::Text("hash", "hash-one"),
        Part::File("photo", "two.png", PNG_BYTES),
        Part::Text("hash", "hash-two"),
        Part::Text("tags", "city"),
        Part::Text("tags", "nature"),
    ];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let photos = app.store.photos().await;
    assert_eq!(photos.len(), 2);
    for photo in &photos {
        assert_eq!(photo.tags, vec!["city".to_string(), "nature".to_string()]);
        assert_eq!(photo.uploader_nickname, "anonymous");
    }
}

#[tokio::test]
async fn test_signed_in_upload_uses_session_user() {
    let app = TestApp::new();
    let cookie = app.sign_in_as("uid-bob", "Bob").await;

    let parts = [
        Part::File("photo", "bob.png", PNG_BYTES),
        Part::Text("hash", "bob-hash"),
        Part::Text("uploader_name", "Mallory"),
    ];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let photos = app.store.photos().await;
    assert_eq!(photos[0].upload_by, "uid-bob");
    assert_eq!(photos[0].uploader_nickname, "Bob");

    // The photo shows up on the uploader's page
    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/mypage", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains(&photos[0].filepath));
}

// =============================================================================
// Rejected Uploads
// =============================================================================

#[tokio::test]
async fn test_upload_without_hash_is_rejected() {
    let app = TestApp::new();

    let parts = [Part::File("photo", "beach.png", PNG_BYTES)];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.photo_count().await, 0);
    assert_eq!(app.blobs.put_count(), 0);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = TestApp::new();

    // A file input left empty by the browser
    let parts = [Part::File("photo", "", b""), Part::Text("tags", "sunset")];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let html = body_text(response).await;
    assert!(html.contains("Please choose a file to upload"));
}

#[tokio::test]
async fn test_upload_with_unknown_tag_is_rejected() {
    let app = TestApp::new();

    let parts = [
        Part::File("photo", "beach.png", PNG_BYTES),
        Part::Text("hash", "abc123"),
        Part::Text("tags", "sunset"),
        Part::Text("tags", "selfie"),
    ];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let html = body_text(response).await;
    assert!(html.contains("Unknown tag: selfie"));
    assert_eq!(app.store.photo_count().await, 0);
}

#[tokio::test]
async fn test_upload_of_non_image_is_rejected() {
    let app = TestApp::new();

    let parts = [
        Part::File("photo", "notes.txt", b"just some text"),
        Part::Text("hash", "text-hash"),
    ];
    let response = app
        .router
        .clone()
        .oneshot(upload_request(&parts, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.blobs.put_count(), 0);
}

#[tokio::test]
async fn test_upload_form_lists_vocabulary() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/upload", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"enctype="multipart/form-data""#));
    assert!(html.contains(r#"name="uploader_name""#));
    for tag in ["sunset", "portrait", "city", "nature"] {
        assert!(html.contains(&format!(r#"value="{}""#, tag)));
    }
}

//! Account and authorization integration tests.
//!
//! Tests verify:
//! - Sign-up keeps nicknames unique and sign-in sets a session cookie
//! - Pages requiring a session redirect to the sign-in page
//! - Only administrators can delete photos or see delete controls
//! - Tampered or expired cookies are ignored
//! - The JSON session, health and fallback endpoints
//! - CORS preflight on the JSON endpoints

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use webpics::server::{RouterConfig, SessionSigner};

use super::test_utils::{
    body_text, card_count, form_request, get_request, photo, TestApp, TEST_SECRET,
};

// =============================================================================
// Sign-up and Sign-in
// =============================================================================

#[tokio::test]
async fn test_signup_then_login_sets_session_cookie() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "/signup",
            "email=alice%40example.com&password=secret123&nickname=Alice",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "/login",
            "email=alice%40example.com&password=secret123",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("webpics_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    // The cookie is accepted on the next request
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/mypage", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("Alice"));
}

#[tokio::test]
async fn test_signup_rejects_taken_nickname() {
    let app = TestApp::new();
    app.sign_in_as("uid-existing", "Alice").await;

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "/signup",
            "email=other%40example.com&password=secret123&nickname=Alice",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let html = body_text(response).await;
    assert!(html.contains("nickname already in use"));
    assert!(html.contains("other@example.com"));
}

#[tokio::test]
async fn test_login_with_wrong_password_rerenders_form() {
    let app = TestApp::new();
    app.identity
        .with_account("alice@example.com", "secret123")
        .await;

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            "/login",
            "email=alice%40example.com&password=wrong",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let html = body_text(response).await;
    assert!(html.contains("Invalid email or password"));
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let cookie = app.sign_in_as("uid-1", "Alice").await;

    let response = app
        .router
        .clone()
        .oneshot(form_request("/logout", "", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("webpics_session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

// =============================================================================
// Profile Page
// =============================================================================

#[tokio::test]
async fn test_mypage_requires_session() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/mypage", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_mypage_updates_nickname() {
    let app = TestApp::new();
    let cookie = app.sign_in_as("uid-1", "Alice").await;
    app.sign_in_as("uid-2", "Bob").await;

    let response = app
        .router
        .clone()
        .oneshot(form_request("/mypage", "nickname=Alicia", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store.profile("uid-1").await.unwrap().nickname, "Alicia");

    let response = app
        .router
        .clone()
        .oneshot(form_request("/mypage", "nickname=Bob", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.profile("uid-1").await.unwrap().nickname, "Alicia");
}

// =============================================================================
// Administration
// =============================================================================

#[tokio::test]
async fn test_admin_deletes_photo() {
    let app = TestApp::new();
    let cookie = app.sign_in_as_admin("uid-admin", "Root").await;
    let record = photo("abc123", &["sunset"], 0);
    app.store.seed_photo(record.clone()).await;

    // Administrators see the delete control in the gallery
    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains(&format!("/admin/photos/{}/delete", record.id)));

    // The admin page lists the record with its hash
    let response = app
        .router
        .clone()
        .oneshot(get_request("/admin", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("abc123"));
    assert!(html.contains(&format!("/admin/photos/{}/delete", record.id)));

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            &format!("/admin/photos/{}/delete", record.id),
            "next=%2F%3Fpage%3D1",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/?page=1");
    assert_eq!(app.store.photo_count().await, 0);

    // Deleting again reports a missing record
    let response = app
        .router
        .clone()
        .oneshot(form_request(
            &format!("/admin/photos/{}/delete", record.id),
            "",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_admin_cannot_delete() {
    let app = TestApp::new();
    let cookie = app.sign_in_as("uid-1", "Alice").await;
    let record = photo("abc123", &["sunset"], 0);
    app.store.seed_photo(record.clone()).await;

    let html = body_text(
        app.router
            .clone()
            .oneshot(get_request("/", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(card_count(&html), 1);
    assert!(!html.contains("/delete"));

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            &format!("/admin/photos/{}/delete", record.id),
            "",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.photo_count().await, 1);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/admin", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_anonymous_delete_redirects_to_login() {
    let app = TestApp::new();
    let record = photo("abc123", &[], 0);
    app.store.seed_photo(record.clone()).await;

    let response = app
        .router
        .clone()
        .oneshot(form_request(
            &format!("/admin/photos/{}/delete", record.id),
            "",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
    assert_eq!(app.store.photo_count().await, 1);
}

// =============================================================================
// Session Cookies
// =============================================================================

#[tokio::test]
async fn test_forged_cookie_is_ignored() {
    let app = TestApp::new();
    app.sign_in_as_admin("uid-admin", "Root").await;

    let forger = SessionSigner::new("some-other-secret-key", Duration::from_secs(3600));
    let cookie = format!("webpics_session={}", forger.issue("uid-admin"));

    let response = app
        .router
        .clone()
        .oneshot(get_request("/admin", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_expired_cookie_is_ignored() {
    let app = TestApp::new();
    app.sign_in_as("uid-1", "Alice").await;

    let signer = SessionSigner::new(TEST_SECRET, Duration::from_secs(3600));
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let cookie = format!(
        "webpics_session={}",
        signer.issue_with_expiry("uid-1", now - 60)
    );

    let response = app
        .router
        .clone()
        .oneshot(get_request("/mypage", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_session_endpoint() {
    let app = TestApp::new();

    let json: serde_json::Value = serde_json::from_str(&body_text(
        app.router
            .clone()
            .oneshot(get_request("/api/session", None))
            .await
            .unwrap(),
    )
    .await)
    .unwrap();
    assert_eq!(json["authenticated"], false);
    assert_eq!(json["is_admin"], false);

    let cookie = app.sign_in_as_admin("uid-admin", "Root").await;
    let json: serde_json::Value = serde_json::from_str(&body_text(
        app.router
            .clone()
            .oneshot(get_request("/api/session", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await)
    .unwrap();
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["uid"], "uid-admin");
    assert_eq!(json["nickname"], "Root");
    assert_eq!(json["is_admin"], true);
}

// =============================================================================
// Service Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_returns_not_found_page() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
}

// =============================================================================
// CORS
// =============================================================================

fn preflight_request(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri(uri)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_session_preflight_allows_any_origin_by_default() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(preflight_request("/api/session", "https://viewer.example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_session_preflight_honors_configured_origins() {
    let app = TestApp::with_router_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_cors_origins(vec!["https://viewer.example.com".to_string()]),
    );

    let response = app
        .router
        .clone()
        .oneshot(preflight_request("/api/session", "https://viewer.example.com"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://viewer.example.com"
    );

    let response = app
        .router
        .clone()
        .oneshot(preflight_request("/api/session", "https://evil.example.com"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    // An empty list disables cross-origin access
    let app = TestApp::with_router_config(
        RouterConfig::new().with_tracing(false).with_cors_origins(vec![]),
    );
    let response = app
        .router
        .clone()
        .oneshot(preflight_request("/health", "https://viewer.example.com"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

//! Router configuration for WebPics.
//!
//! This module defines the HTTP routes and applies middleware for body
//! limits, CORS, static files and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /                              - Gallery (public)
//! /upload                        - Upload form and submission (public)
//! /login, /signup, /logout       - Accounts
//! /mypage                        - Profile (signed in)
//! /admin                         - Administration (administrators)
//! /admin/photos/{id}/delete      - Delete a photo (administrators)
//! /api/session                   - Session JSON
//! /health                        - Health check
//! /static/*                      - Static assets (when configured)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use webpics::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(gallery, accounts, sessions);
//! let config = RouterConfig::new().with_static_dir("static");
//!
//! let router = create_router(state, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    admin_handler, delete_photo_handler, gallery_handler, health_handler, login_form_handler,
    login_handler, logout_handler, mypage_handler, mypage_update_handler, not_found_handler,
    session_handler, signup_form_handler, signup_handler, upload_form_handler, upload_handler,
    AppState,
};

/// Default request body limit for uploads (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins for the JSON endpoints (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Directory served under `/static`
    pub static_dir: Option<PathBuf>,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - No static directory
    /// - Uploads up to 50 MiB
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            static_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Serve files from `dir` under `/static`.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Set the request body limit.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `state` - Shared services and session signer
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    let cors = build_cors_layer(&config);

    let pages = Router::new()
        .route("/", get(gallery_handler))
        .route("/upload", get(upload_form_handler).post(upload_handler))
        .route("/login", get(login_form_handler).post(login_handler))
        .route("/signup", get(signup_form_handler).post(signup_handler))
        .route("/logout", post(logout_handler))
        .route("/mypage", get(mypage_handler).post(mypage_update_handler))
        .route("/admin", get(admin_handler))
        .route("/admin/photos/{id}/delete", post(delete_photo_handler));

    let api = Router::new()
        .route("/api/session", get(session_handler))
        .route("/health", get(health_handler))
        .layer(cors);

    let mut router = Router::new()
        .merge(pages)
        .merge(api)
        .fallback(not_found_handler);

    if let Some(dir) = &config.static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    let router = router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state);

    // Add tracing if enabled
    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

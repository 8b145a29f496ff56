//! HTTP request handlers for the WebPics gallery.
//!
//! # Endpoints
//!
//! - `GET /` - Gallery with tag filter and pagination
//! - `GET|POST /upload` - Upload form and submission
//! - `GET|POST /login`, `GET|POST /signup`, `POST /logout` - Accounts
//! - `GET|POST /mypage` - Profile and own uploads
//! - `GET /admin`, `POST /admin/photos/{id}/delete` - Administration
//! - `GET /api/session` - Current session as JSON
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use bytes::Bytes;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{GalleryError, IdentityError};
use crate::gallery::{AccountService, GalleryService, ListingQuery, UploadBatch, Uploader};

use super::auth::{resolve_session, AdminUser, CurrentUser, MaybeUser, SessionSigner};
use super::pages;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<GalleryService>,

    pub accounts: Arc<AccountService>,

    /// Session token signer and cookie builder
    pub sessions: Arc<SessionSigner>,

    /// Time zone upload times are shown in
    pub display_offset: FixedOffset,
}

impl AppState {
    /// Create application state displaying times in UTC.
    pub fn new(gallery: GalleryService, accounts: AccountService, sessions: SessionSigner) -> Self {
        Self {
            gallery: Arc::new(gallery),
            accounts: Arc::new(accounts),
            sessions: Arc::new(sessions),
            display_offset: Utc.fix(),
        }
    }

    /// Show upload times at a fixed UTC offset.
    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct NicknameForm {
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    /// Page to return to after deleting
    #[serde(default)]
    pub next: Option<String>,
}

/// Fields of the multipart upload form.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<(String, Bytes)>,
    hashes: Vec<String>,
    tags: Vec<String>,
    uploader_id: Option<String>,
    uploader_name: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "store_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Current session as seen by the browser.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    pub is_admin: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// HTTP status and error type identifier for a gallery error.
pub fn error_status(err: &GalleryError) -> (StatusCode, &'static str) {
    match err {
        GalleryError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        GalleryError::Duplicate { .. } => (StatusCode::CONFLICT, "duplicate"),
        GalleryError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        GalleryError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        GalleryError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        GalleryError::Identity(IdentityError::InvalidCredentials) => {
            (StatusCode::BAD_REQUEST, "invalid_credentials")
        }
        GalleryError::Identity(IdentityError::EmailExists) => (StatusCode::CONFLICT, "email_exists"),
        GalleryError::Identity(IdentityError::Rejected(_)) => {
            (StatusCode::BAD_REQUEST, "identity_rejected")
        }
        GalleryError::Identity(IdentityError::Request(_)) => {
            (StatusCode::BAD_GATEWAY, "identity_error")
        }
        GalleryError::Store(_) => (StatusCode::BAD_GATEWAY, "store_error"),
        GalleryError::Blob(_) => (StatusCode::BAD_GATEWAY, "blob_error"),
    }
}

/// Log an error based on its severity:
/// - 5xx errors at ERROR level (upstream failures)
/// - 404 at DEBUG level (common and expected)
/// - other 4xx at WARN level
fn log_error(status: StatusCode, error_type: &str, message: &str) {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }
}

const UPSTREAM_FAILURE_MESSAGE: &str =
    "Something went wrong while contacting a backing service. Please try again later.";

/// Error from an HTML page handler.
///
/// Unauthorized requests are redirected to the sign-in page; everything
/// else renders an error page with the matching status.
#[derive(Debug)]
pub struct PageError(pub GalleryError);

impl From<GalleryError> for PageError {
    fn from(err: GalleryError) -> Self {
        PageError(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if matches!(self.0, GalleryError::Unauthorized) {
            debug!("Sign-in required, redirecting to /login");
            return Redirect::to("/login").into_response();
        }

        let (status, error_type) = error_status(&self.0);
        let message = self.0.to_string();
        log_error(status, error_type, &message);

        let shown = if status.is_server_error() {
            UPSTREAM_FAILURE_MESSAGE.to_string()
        } else {
            message
        };
        (status, Html(pages::error_page(status, &shown))).into_response()
    }
}

/// Error from a JSON handler.
#[derive(Debug)]
pub struct ApiError(pub GalleryError);

impl From<GalleryError> for ApiError {
    fn from(err: GalleryError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = error_status(&self.0);
        let message = self.0.to_string();
        log_error(status, error_type, &message);

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Re-render a form with an inline message, or fail the request.
///
/// `render` receives the message of a user-caused error.
fn form_error(err: GalleryError, render: impl FnOnce(&str) -> String) -> Result<Response, PageError> {
    if !err.is_form_error() {
        return Err(PageError(err));
    }
    let (status, error_type) = error_status(&err);
    let message = err.to_string();
    debug!(error_type, status = status.as_u16(), "Form rejected: {}", message);
    Ok((status, Html(render(&message))).into_response())
}

// =============================================================================
// Gallery
// =============================================================================

/// Handle gallery requests.
///
/// # Endpoint
///
/// `GET /`
///
/// # Query Parameters
///
/// - `tags`: Required tags, repeated or comma-separated
/// - `page`: 1-based page number, clamped to the available range
pub async fn gallery_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, PageError> {
    let query = ListingQuery::from_query_string(query.as_deref().unwrap_or_default());
    let page = state.gallery.list(&query).await?;

    Ok(Html(pages::gallery_page(
        &page,
        state.gallery.vocabulary(),
        user.as_ref(),
        &state.display_offset,
    )))
}

// =============================================================================
// Upload
// =============================================================================

/// Handle upload form requests.
///
/// # Endpoint
///
/// `GET /upload`
pub async fn upload_form_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Html<String> {
    Html(pages::upload_page(
        state.gallery.vocabulary(),
        user.as_ref(),
        &[],
        None,
    ))
}

/// Handle upload submissions.
///
/// # Endpoint
///
/// `POST /upload` (multipart)
///
/// # Fields
///
/// - `photo`: Image file, repeated
/// - `hash`: Content hash of the file at the same position, repeated
/// - `tags`: Tag from the vocabulary, repeated
/// - `uploader_id`, `uploader_name`: Used when not signed in
///
/// # Response
///
/// `303 See Other` to `/` on success.
///
/// # Errors
///
/// - `400 Bad Request`: Form re-rendered with the validation message
/// - `409 Conflict`: Form re-rendered, a file was already uploaded
/// - `502 Bad Gateway`: A backing service failed
pub async fn upload_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let vocabulary = state.gallery.vocabulary();

    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            return form_error(err, |message| {
                pages::upload_page(vocabulary, user.as_ref(), &[], Some(message))
            })
        }
    };

    let uploader = match &user {
        Some(user) => Uploader::new(&user.uid, user.display_name()),
        None => Uploader::from_form(form.uploader_id.as_deref(), form.uploader_name.as_deref()),
    };
    let tags = crate::gallery::normalize_tags(&form.tags);
    let batch = UploadBatch::pair(form.files, form.hashes, tags.clone(), uploader);

    match state.gallery.upload(batch).await {
        Ok(report) => {
            debug!(stored = report.stored.len(), "Upload batch complete");
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => form_error(err, |message| {
            pages::upload_page(vocabulary, user.as_ref(), &tags, Some(message))
        }),
    }
}

/// Collect the multipart fields of the upload form.
///
/// File inputs submitted without a chosen file (no name, no bytes) are skipped.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, GalleryError> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(multipart_error(err)),
        };
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "photo" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.push((file_name, data));
            }
            "hash" => form
                .hashes
                .push(field.text().await.map_err(multipart_error)?),
            "tags" => form.tags.push(field.text().await.map_err(multipart_error)?),
            "uploader_id" => form.uploader_id = Some(field.text().await.map_err(multipart_error)?),
            "uploader_name" => {
                form.uploader_name = Some(field.text().await.map_err(multipart_error)?)
            }
            other => debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> GalleryError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GalleryError::validation("The upload is too large")
    } else {
        GalleryError::validation(format!("Could not read the upload: {}", err.body_text()))
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// `GET /login`
pub async fn login_form_handler() -> Html<String> {
    Html(pages::login_page("", None))
}

/// Handle sign-in submissions.
///
/// # Endpoint
///
/// `POST /login` (form: `email`, `password`)
///
/// # Response
///
/// `303 See Other` to `/` with the session cookie set.
pub async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    match state.accounts.sign_in(&form.email, &form.password).await {
        Ok(identity) => {
            let token = state.sessions.issue(&identity.uid);
            Ok((
                [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
                Redirect::to("/"),
            )
                .into_response())
        }
        Err(err) => form_error(err, |message| pages::login_page(&form.email, Some(message))),
    }
}

/// `GET /signup`
pub async fn signup_form_handler() -> Html<String> {
    Html(pages::signup_page("", "", None))
}

/// Handle sign-up submissions.
///
/// # Endpoint
///
/// `POST /signup` (form: `email`, `password`, `nickname`)
///
/// # Response
///
/// `303 See Other` to `/login`.
pub async fn signup_handler(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, PageError> {
    match state
        .accounts
        .sign_up(&form.email, &form.password, &form.nickname)
        .await
    {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(err) => form_error(err, |message| {
            pages::signup_page(&form.email, &form.nickname, Some(message))
        }),
    }
}

/// `POST /logout`: clear the session cookie and go back to the gallery.
pub async fn logout_handler(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

/// Handle profile page requests.
///
/// # Endpoint
///
/// `GET /mypage` (signed in)
pub async fn mypage_handler(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Html<String>, PageError> {
    let photos = state.gallery.photos_by(&user.uid).await?;
    Ok(Html(pages::my_page(
        &user,
        &photos,
        &state.display_offset,
        None,
    )))
}

/// Handle nickname updates.
///
/// # Endpoint
///
/// `POST /mypage` (signed in, form: `nickname`)
pub async fn mypage_update_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<NicknameForm>,
) -> Result<Response, PageError> {
    match state.accounts.update_nickname(&user.uid, &form.nickname).await {
        Ok(_) => Ok(Redirect::to("/mypage").into_response()),
        Err(err) if err.is_form_error() => {
            let photos = state.gallery.photos_by(&user.uid).await?;
            form_error(err, |message| {
                pages::my_page(&user, &photos, &state.display_offset, Some(message))
            })
        }
        Err(err) => Err(PageError(err)),
    }
}

// =============================================================================
// Administration
// =============================================================================

/// Handle admin page requests.
///
/// # Endpoint
///
/// `GET /admin` (administrators only)
pub async fn admin_handler(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Html<String>, PageError> {
    let photos = state.gallery.all_photos().await?;
    Ok(Html(pages::admin_page(
        &user,
        &photos,
        &state.display_offset,
    )))
}

/// Handle photo deletion.
///
/// # Endpoint
///
/// `POST /admin/photos/{id}/delete` (administrators only, form: `next`)
///
/// # Response
///
/// `303 See Other` to `next` when it is a local path, otherwise `/admin`.
///
/// # Errors
///
/// - `403 Forbidden`: Signed in without the administrator role
/// - `404 Not Found`: No record with this id
pub async fn delete_photo_handler(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Result<Response, PageError> {
    state.gallery.delete(&id).await?;
    debug!(admin = %user.uid, id = %id, "Photo deleted by administrator");
    Ok(Redirect::to(local_redirect(form.next.as_deref())).into_response())
}

/// Accept only same-site paths as redirect targets.
fn local_redirect(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/admin",
    }
}

// =============================================================================
// JSON Endpoints
// =============================================================================

/// Handle session observation.
///
/// # Endpoint
///
/// `GET /api/session`
///
/// # Response
///
/// ```json
/// { "authenticated": true, "uid": "u1", "nickname": "Alice", "is_admin": false }
/// ```
pub async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let response = match resolve_session(&state, &headers).await? {
        Some(user) => SessionResponse {
            authenticated: true,
            nickname: user.profile.as_ref().map(|p| p.nickname.clone()),
            is_admin: user.is_admin,
            uid: Some(user.uid),
        },
        None => SessionResponse {
            authenticated: false,
            uid: None,
            nickname: None,
            is_admin: false,
        },
    };
    Ok(Json(response))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(pages::not_found_page()))
}

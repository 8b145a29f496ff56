//! Test utilities for integration tests.
//!
//! This module provides in-memory implementations of the store interfaces
//! and helpers for building requests against the full router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tokio::sync::RwLock;

use webpics::error::{BlobError, IdentityError, StoreError};
use webpics::gallery::{NewPhoto, PhotoRecord, ScalarTags, TagVocabulary, UserProfile};
use webpics::server::{create_router, AppState, RouterConfig, SessionSigner};
use webpics::store::{BlobStore, DocumentStore, Identity, IdentityProvider, InsertOutcome};
use webpics::{AccountService, GalleryService};

pub const TEST_SECRET: &str = "test-secret-key-for-session-cookies";
pub const TEST_TAGS: &[&str] = &["sunset", "portrait", "city", "nature"];
pub const PUBLIC_BASE: &str = "https://cdn.example.com";
pub const BOUNDARY: &str = "webpics-test-boundary";

/// Smallest byte sequence recognized as a PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

// =============================================================================
// In-Memory Document Store
// =============================================================================

/// Document store keeping photos and profiles in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    photos: RwLock<Vec<PhotoRecord>>,
    profiles: RwLock<Vec<(String, UserProfile)>>,
    scalar: RwLock<Vec<ScalarTags>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a photo record directly.
    pub async fn seed_photo(&self, record: PhotoRecord) {
        self.photos.write().await.push(record);
    }

    /// Store a profile directly, including its role.
    pub async fn seed_profile(&self, uid: &str, profile: UserProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.retain(|(id, _)| id != uid);
        profiles.push((uid.to_string(), profile));
    }

    /// Insert a photo whose `tags` field is still the legacy scalar string.
    pub async fn seed_scalar_photo(&self, mut record: PhotoRecord, value: &str) {
        record.tags.clear();
        self.scalar.write().await.push(ScalarTags {
            id: record.id.clone(),
            value: value.to_string(),
        });
        self.photos.write().await.push(record);
    }

    pub async fn photo_count(&self) -> usize {
        self.photos.read().await.len()
    }

    pub async fn photos(&self) -> Vec<PhotoRecord> {
        self.photos.read().await.clone()
    }

    pub async fn profile(&self, uid: &str) -> Option<UserProfile> {
        self.profiles
            .read()
            .await
            .iter()
            .find(|(id, _)| id == uid)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_photos(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        let mut photos = self.photos.read().await.clone();
        photos.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(photos)
    }

    async fn find_photo_by_hash(
        &self,
        file_hash: &str,
    ) -> Result<Option<PhotoRecord>, StoreError> {
        Ok(self
            .photos
            .read()
            .await
            .iter()
            .find(|p| p.file_hash == file_hash)
            .cloned())
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<InsertOutcome, StoreError> {
        let id = photo.document_id();
        let mut photos = self.photos.write().await;
        if photos.iter().any(|p| p.id == id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let record = photo.clone().into_record(id);
        photos.push(record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn delete_photo(&self, id: &str) -> Result<bool, StoreError> {
        let mut photos = self.photos.write().await;
        let before = photos.len();
        photos.retain(|p| p.id != id);
        Ok(photos.len() != before)
    }

    async fn scalar_tag_photos(&self) -> Result<Vec<ScalarTags>, StoreError> {
        Ok(self.scalar.read().await.clone())
    }

    async fn set_photo_tags(&self, id: &str, tags: &[String]) -> Result<(), StoreError> {
        self.scalar.write().await.retain(|s| s.id != id);
        if let Some(photo) = self.photos.write().await.iter_mut().find(|p| p.id == id) {
            photo.tags = tags.to_vec();
        }
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profile(uid).await)
    }

    async fn find_uid_by_nickname(&self, nickname: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|(_, p)| p.nickname == nickname)
            .map(|(id, _)| id.clone()))
    }

    async fn set_nickname(&self, uid: &str, nickname: &str) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|(id, _)| id == uid) {
            Some((_, profile)) => profile.nickname = nickname.to_string(),
            None => profiles.push((uid.to_string(), UserProfile::new(nickname))),
        }
        Ok(())
    }
}

// =============================================================================
// In-Memory Blob Store
// =============================================================================

/// Blob store that records keys and serves them from a fixed base URL.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<Vec<(String, String, Bytes)>>,
    put_count: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .await
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<String, BlobError> {
        self.put_count.fetch_add(1, Ordering::SeqCst);
        self.objects
            .write()
            .await
            .push((key.to_string(), content_type.to_string(), data));
        Ok(format!("{}/{}", PUBLIC_BASE, key))
    }
}

// =============================================================================
// Mock Identity Provider
// =============================================================================

/// Identity provider with accounts kept in memory. User ids are `uid-<n>`.
#[derive(Default)]
pub struct MockIdentity {
    accounts: RwLock<Vec<(String, String, String)>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its user id.
    pub async fn with_account(&self, email: &str, password: &str) -> String {
        let mut accounts = self.accounts.write().await;
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.push((uid.clone(), email.to_string(), password.to_string()));
        uid
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        if password.len() < 6 {
            return Err(IdentityError::Rejected(
                "Password should be at least 6 characters".to_string(),
            ));
        }
        if self.accounts.read().await.iter().any(|(_, e, _)| e == email) {
            return Err(IdentityError::EmailExists);
        }
        let uid = self.with_account(email, password).await;
        Ok(Identity {
            uid,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        self.accounts
            .read()
            .await
            .iter()
            .find(|(_, e, p)| e == email && p == password)
            .map(|(uid, e, _)| Identity {
                uid: uid.clone(),
                email: e.clone(),
            })
            .ok_or(IdentityError::InvalidCredentials)
    }
}

// =============================================================================
// Application Setup
// =============================================================================

/// A router wired to in-memory services, with handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryDocumentStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub identity: Arc<MockIdentity>,
    pub sessions: SessionSigner,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_size(12)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self::build(page_size, RouterConfig::new().with_tracing(false))
    }

    pub fn with_router_config(config: RouterConfig) -> Self {
        Self::build(12, config)
    }

    fn build(page_size: usize, config: RouterConfig) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let identity = Arc::new(MockIdentity::new());
        let vocabulary = TagVocabulary::new(TEST_TAGS.iter().copied()).unwrap();

        let gallery = GalleryService::new(store.clone(), blobs.clone(), Arc::new(vocabulary))
            .with_page_size(page_size);
        let accounts = AccountService::new(identity.clone(), store.clone());
        let sessions = SessionSigner::new(TEST_SECRET, Duration::from_secs(3600));

        let state = AppState::new(gallery, accounts, sessions.clone());
        let router = create_router(state, config);

        Self {
            router,
            store,
            blobs,
            identity,
            sessions,
        }
    }

    /// Cookie header value for a signed-in user.
    pub fn session_cookie(&self, uid: &str) -> String {
        format!("webpics_session={}", self.sessions.issue(uid))
    }

    /// Create a user with a profile and return its cookie header value.
    pub async fn sign_in_as(&self, uid: &str, nickname: &str) -> String {
        self.store
            .seed_profile(uid, UserProfile::new(nickname))
            .await;
        self.session_cookie(uid)
    }

    /// Create an administrator and return its cookie header value.
    pub async fn sign_in_as_admin(&self, uid: &str, nickname: &str) -> String {
        self.store
            .seed_profile(
                uid,
                UserProfile {
                    nickname: nickname.to_string(),
                    role: Some("admin".to_string()),
                },
            )
            .await;
        self.session_cookie(uid)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A stored photo record uploaded `minutes` after a fixed instant.
pub fn photo(hash: &str, tags: &[&str], minutes: i64) -> PhotoRecord {
    let upload_time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
        + chrono::Duration::minutes(minutes);
    NewPhoto {
        filepath: format!("{}/webpics/{}.png", PUBLIC_BASE, hash),
        file_hash: hash.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        upload_time,
        upload_by: "uid-seed".to_string(),
        uploader_nickname: "Seeder".to_string(),
    }
    .into_record(webpics::gallery::photo_document_id(hash))
}

// =============================================================================
// Request Helpers
// =============================================================================

/// A part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode parts as `multipart/form-data` with [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A multipart POST to `/upload`.
pub fn upload_request(parts: &[Part<'_>], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// A url-encoded form POST.
pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A GET request, optionally with a cookie.
pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Number of photo cards on a rendered page.
pub fn card_count(html: &str) -> usize {
    html.matches(r#"<figure class="card">"#).count()
}

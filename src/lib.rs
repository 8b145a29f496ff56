//! # WebPics
//!
//! A small photo gallery: visitors browse uploaded images filtered by tags,
//! anyone may upload, registered users manage a nickname, and administrators
//! delete records.
//!
//! Image bytes live in an S3-compatible bucket, photo and profile records in
//! Firestore, and accounts in Firebase Authentication. Each of these sits
//! behind a trait in [`store`] so the gallery logic can run against
//! in-memory fakes.
//!
//! ## Features
//!
//! - **Tag filtering**: AND-filter over a fixed tag vocabulary, with pagination
//! - **Content de-duplication**: uploads carry a SHA-256 hash; a hash can be stored once
//! - **Accounts**: email/password sign-up and sign-in with unique nicknames
//! - **Signed sessions**: HMAC-SHA256 session cookies checked on the server
//! - **Tag migration**: a command rewriting legacy scalar `tags` fields into arrays
//!
//! ## Architecture
//!
//! - [`gallery`] - Listing, upload validation, accounts and migration logic
//! - [`store`] - Document store, blob store and identity provider interfaces
//! - [`server`] - Axum-based HTTP server, pages and session handling
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use webpics::{
//!     create_router, create_s3_client, AccountService, AppState, FirebaseIdentity,
//!     FirestoreConfig, FirestoreStore, GalleryService, RouterConfig, S3BlobStore,
//!     SessionSigner, TagVocabulary,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let vocabulary = TagVocabulary::load("tags.json")?;
//!     let store = Arc::new(FirestoreStore::new(FirestoreConfig::new("my-project"))?);
//!     let client = create_s3_client(None, "us-east-1").await;
//!     let blobs = S3BlobStore::new(
//!         client,
//!         "my-photos".to_string(),
//!         "https://my-photos.s3.us-east-1.amazonaws.com".to_string(),
//!     );
//!     let identity = FirebaseIdentity::new(
//!         "https://identitytoolkit.googleapis.com/v1",
//!         "api-key",
//!         Duration::from_secs(30),
//!     )?;
//!
//!     let gallery = GalleryService::new(store.clone(), Arc::new(blobs), Arc::new(vocabulary));
//!     let accounts = AccountService::new(Arc::new(identity), store);
//!     let sessions = SessionSigner::new("a-long-random-session-secret", Duration::from_secs(3600));
//!
//!     let router = create_router(AppState::new(gallery, accounts, sessions), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gallery;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command, FirestoreArgs, MigrateConfig, ServeConfig};
pub use error::{BlobError, GalleryError, IdentityError, StoreError};
pub use gallery::{
    migrate_scalar_tags, normalize_tags, AccountService, GalleryPage, GalleryService,
    ListingQuery, MigrationReport, NewPhoto, PhotoRecord, TagVocabulary, UploadBatch, UploadFile,
    UploadReport, Uploader, UserProfile,
};
pub use server::{
    create_router, health_handler, AppState, CurrentUser, ErrorResponse, HealthResponse,
    RouterConfig, SessionSigner,
};
pub use store::{
    create_s3_client, BlobStore, DocumentStore, FirebaseIdentity, FirestoreConfig,
    FirestoreStore, Identity, IdentityProvider, InsertOutcome, S3BlobStore,
};

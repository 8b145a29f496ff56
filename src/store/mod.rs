//! Interfaces to the external services.
//!
//! The gallery never talks to a remote API directly. It goes through three
//! injected interfaces so the upload, listing and de-duplication logic can
//! be exercised without network calls:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │              GalleryService / AccountService              │
//! └──────┬──────────────────────┬──────────────────────┬──────┘
//!        ▼                      ▼                      ▼
//! ┌──────────────┐      ┌───────────────┐      ┌──────────────────┐
//! │DocumentStore │      │  BlobStore    │      │ IdentityProvider │
//! │ (Firestore)  │      │ (S3 bucket)   │      │ (Firebase Auth)  │
//! └──────────────┘      └───────────────┘      └──────────────────┘
//! ```

pub mod firestore;
mod identity;
mod s3_blob;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BlobError, IdentityError, StoreError};
use crate::gallery::{NewPhoto, PhotoRecord, ScalarTags, UserProfile};

pub use firestore::{
    FirestoreConfig, FirestoreStore, DEFAULT_DATABASE, DEFAULT_FIRESTORE_ENDPOINT,
    DEFAULT_PHOTOS_COLLECTION, DEFAULT_USERS_COLLECTION,
};
pub use identity::{FirebaseIdentity, DEFAULT_IDENTITY_ENDPOINT};
pub use s3_blob::{create_s3_client, default_public_base_url, S3BlobStore};

// =============================================================================
// Document Store
// =============================================================================

/// Result of a conditional photo insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was created
    Created(PhotoRecord),

    /// A record with the same content hash already exists; nothing was written
    AlreadyExists,
}

/// Remote, schema-less persistence for photo and user documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every photo record. Firestore orders by the stored `uploadTime`
    /// string; callers sort by parsed time.
    async fn list_photos(&self) -> Result<Vec<PhotoRecord>, StoreError>;

    /// The photo record with exactly this content hash, if any.
    async fn find_photo_by_hash(&self, file_hash: &str)
        -> Result<Option<PhotoRecord>, StoreError>;

    /// Create a photo record unless one with the same content hash exists.
    ///
    /// Implementations must make the existence check and the write a single
    /// atomic operation.
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<InsertOutcome, StoreError>;

    /// Delete a photo record. Returns `false` if it did not exist.
    async fn delete_photo(&self, id: &str) -> Result<bool, StoreError>;

    /// Records whose `tags` field is still a single string.
    async fn scalar_tag_photos(&self) -> Result<Vec<ScalarTags>, StoreError>;

    /// Overwrite only the `tags` field of a photo record.
    async fn set_photo_tags(&self, id: &str, tags: &[String]) -> Result<(), StoreError>;

    /// The profile stored for a user id.
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;

    /// The user id owning a nickname, if any.
    async fn find_uid_by_nickname(&self, nickname: &str) -> Result<Option<String>, StoreError>;

    /// Write the nickname of a profile, creating the profile if needed.
    /// Other profile fields are left untouched.
    async fn set_nickname(&self, uid: &str, nickname: &str) -> Result<(), StoreError>;
}

// =============================================================================
// Blob Store
// =============================================================================

/// Remote storage serving image bytes by URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return the URL it is served from.
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<String, BlobError>;
}

// =============================================================================
// Identity Provider
// =============================================================================

/// An account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id
    pub uid: String,

    pub email: String,
}

/// Hosted email/password authentication.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Check credentials of an existing account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
}

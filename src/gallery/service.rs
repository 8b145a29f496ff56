//! Gallery service: listing, uploading and deleting photos.
//!
//! # Upload pipeline
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    GalleryService::upload                      │
//! │  1. Validate whole batch (files, hashes, tags, image bytes)    │
//! │  2. Per file, in order:                                        │
//! │       a. look up hash        -> Duplicate (abort, no rollback) │
//! │       b. put bytes           -> served URL                     │
//! │       c. check URL           -> Validation (abort)             │
//! │       d. conditional insert  -> Duplicate if it lost a race    │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::GalleryError;
use crate::store::{BlobStore, DocumentStore, InsertOutcome};

use super::listing::{paginate, GalleryPage, ListingQuery, DEFAULT_PAGE_SIZE};
use super::record::{NewPhoto, PhotoRecord};
use super::tags::TagVocabulary;
use super::upload::{
    is_resolvable_url, object_key, validate_batch, UploadBatch, UploadReport, DEFAULT_KEY_PREFIX,
};

/// Photo operations over the injected document and object stores.
#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    vocabulary: Arc<TagVocabulary>,
    page_size: usize,
    key_prefix: String,
}

impl GalleryService {
    /// Create a service with the default page size and key prefix.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        vocabulary: Arc<TagVocabulary>,
    ) -> Self {
        Self {
            store,
            blobs,
            vocabulary,
            page_size: DEFAULT_PAGE_SIZE,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Set the number of photos per page (at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the object key prefix for uploaded bytes.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn vocabulary(&self) -> &TagVocabulary {
        &self.vocabulary
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// One page of the gallery, filtered by the query's tags.
    pub async fn list(&self, query: &ListingQuery) -> Result<GalleryPage, GalleryError> {
        let photos = self.newest_first().await?;
        let page = paginate(photos, query, self.page_size);
        debug!(
            tags = ?query.tags,
            page = page.page,
            total_pages = page.total_pages,
            total_photos = page.total_photos,
            "Listed gallery page"
        );
        Ok(page)
    }

    /// Every photo, newest first.
    pub async fn all_photos(&self) -> Result<Vec<PhotoRecord>, GalleryError> {
        self.newest_first().await
    }

    /// Photos uploaded by one user, newest first.
    pub async fn photos_by(&self, uid: &str) -> Result<Vec<PhotoRecord>, GalleryError> {
        let photos = self.newest_first().await?;
        Ok(photos.into_iter().filter(|p| p.upload_by == uid).collect())
    }

    /// All stored photos ordered by upload time, newest first. The store
    /// makes no ordering guarantee.
    async fn newest_first(&self) -> Result<Vec<PhotoRecord>, GalleryError> {
        let mut photos = self.store.list_photos().await?;
        photos.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(photos)
    }

    /// Store a batch of photos.
    ///
    /// Files are processed in order. A duplicate aborts the rest of the
    /// batch; files stored before it stay stored.
    pub async fn upload(&self, batch: UploadBatch) -> Result<UploadReport, GalleryError> {
        let kinds = validate_batch(&batch, &self.vocabulary)?;
        let UploadBatch {
            files,
            tags,
            uploader,
        } = batch;

        let mut stored: Vec<PhotoRecord> = Vec::with_capacity(files.len());

        for (file, kind) in files.into_iter().zip(kinds) {
            let Some(hash) = file.hash else {
                return Err(GalleryError::validation(format!(
                    "No content hash was sent for {}",
                    file.file_name
                )));
            };

            if self.store.find_photo_by_hash(&hash).await?.is_some() {
                info!(hash = %hash, stored = stored.len(), "Rejected duplicate upload");
                return Err(GalleryError::Duplicate {
                    hash,
                    stored: stored.len(),
                });
            }

            let now = Utc::now();
            let key = object_key(&self.key_prefix, &file.file_name, kind.extension, &now);
            let size = file.data.len();
            let url = self.blobs.put(&key, kind.content_type, file.data).await?;
            if !is_resolvable_url(&url) {
                warn!(key = %key, url = %url, "Object store returned an unusable URL");
                return Err(GalleryError::validation(format!(
                    "Could not resolve a URL for {}",
                    file.file_name
                )));
            }

            let photo = NewPhoto {
                filepath: url,
                file_hash: hash.clone(),
                tags: tags.clone(),
                upload_time: now,
                upload_by: uploader.id.clone(),
                uploader_nickname: uploader.name.clone(),
            };

            match self.store.insert_photo(&photo).await? {
                InsertOutcome::Created(record) => {
                    info!(
                        id = %record.id,
                        key = %key,
                        size,
                        uploader = %record.upload_by,
                        "Stored photo"
                    );
                    stored.push(record);
                }
                InsertOutcome::AlreadyExists => {
                    warn!(
                        hash = %hash,
                        key = %key,
                        "Concurrent upload stored this content first; object left orphaned"
                    );
                    return Err(GalleryError::Duplicate {
                        hash,
                        stored: stored.len(),
                    });
                }
            }
        }

        Ok(UploadReport { stored })
    }

    /// Delete a photo record. The image bytes are left in the object store.
    pub async fn delete(&self, id: &str) -> Result<(), GalleryError> {
        if !self.store.delete_photo(id).await? {
            return Err(GalleryError::NotFound(format!("photo {}", id)));
        }
        info!(id = %id, "Deleted photo");
        Ok(())
    }
}

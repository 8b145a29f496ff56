//! Photo gallery domain: records, tags, listing, uploads and accounts.
//!
//! - [`GalleryService`] lists, uploads and deletes photos
//! - [`AccountService`] signs users up and in and manages nicknames
//! - [`migrate_scalar_tags`] rewrites legacy tag fields

mod accounts;
mod listing;
mod migrate;
mod record;
mod service;
mod tags;
mod upload;

pub use accounts::{validate_nickname, AccountService, MAX_NICKNAME_CHARS};
pub use listing::{
    clamp_page, filter_by_tags, page_count, paginate, GalleryPage, ListingQuery,
    DEFAULT_PAGE_SIZE,
};
pub use migrate::{migrate_scalar_tags, MigrationReport, TagRewrite};
pub use record::{
    format_upload_time, parse_upload_time, photo_document_id, NewPhoto, PhotoRecord, ScalarTags,
    UserProfile, ANONYMOUS_UPLOADER, DEFAULT_ADMIN_ROLE,
};
pub use service::GalleryService;
pub use tags::{normalize_tags, TagVocabulary, VocabularyError};
pub use upload::{
    detect_image, is_resolvable_url, object_key, validate_batch, ImageKind, UploadBatch,
    UploadFile, UploadReport, Uploader, DEFAULT_KEY_PREFIX,
};

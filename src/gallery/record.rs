//! Photo and profile records as seen by the gallery services.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Default role marker granting administrator rights.
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

/// Uploader id and name used when neither a session nor form fields name one.
pub const ANONYMOUS_UPLOADER: &str = "anonymous";

/// A stored photo's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoRecord {
    /// Document id in the photo collection
    pub id: String,

    /// Served URL of the image bytes
    pub filepath: String,

    /// Client-computed content hash (empty for legacy records)
    pub file_hash: String,

    /// Tags in the order they were submitted
    pub tags: Vec<String>,

    /// Upload time
    pub upload_time: DateTime<Utc>,

    /// Uploader identifier
    pub upload_by: String,

    /// Uploader display name at upload time
    pub uploader_nickname: String,
}

impl PhotoRecord {
    /// Whether this record carries every tag in `required`.
    pub fn has_all_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }
}

/// A photo record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub filepath: String,
    pub file_hash: String,
    pub tags: Vec<String>,
    pub upload_time: DateTime<Utc>,
    pub upload_by: String,
    pub uploader_nickname: String,
}

impl NewPhoto {
    /// Document id for this photo, derived from its content hash.
    ///
    /// Creating a document under this id fails when it already exists, which
    /// makes the insert conditional on the hash being new.
    pub fn document_id(&self) -> String {
        photo_document_id(&self.file_hash)
    }

    /// Attach a document id, producing the stored record.
    pub fn into_record(self, id: impl Into<String>) -> PhotoRecord {
        PhotoRecord {
            id: id.into(),
            filepath: self.filepath,
            file_hash: self.file_hash,
            tags: self.tags,
            upload_time: self.upload_time,
            upload_by: self.upload_by,
            uploader_nickname: self.uploader_nickname,
        }
    }
}

/// Hex SHA-256 of a content hash, used as the photo document id.
pub fn photo_document_id(file_hash: &str) -> String {
    hex::encode(Sha256::digest(file_hash.as_bytes()))
}

/// Format an upload time the way it is persisted: RFC 3339, UTC, milliseconds.
///
/// All timestamps share one width so string order equals time order.
pub fn format_upload_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a persisted upload time.
pub fn parse_upload_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// A user profile owned by the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub nickname: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            role: None,
        }
    }

    /// Whether the profile's role equals the privileged marker.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// A record whose `tags` field is still a single string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarTags {
    pub id: String,
    pub value: String,
}

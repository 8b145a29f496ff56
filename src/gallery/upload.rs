//! Upload batches and the checks applied before any byte is stored.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::ImageFormat;

use crate::error::GalleryError;

use super::record::{PhotoRecord, ANONYMOUS_UPLOADER};
use super::tags::TagVocabulary;

/// Default object key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "webpics";

/// Longest file stem kept in an object key.
const MAX_STEM_LEN: usize = 64;

/// One file of an upload batch.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Name the browser reported for the file
    pub file_name: String,

    pub data: Bytes,

    /// Client-computed content hash paired with this file
    pub hash: Option<String>,
}

/// Who is uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploader {
    pub id: String,
    pub name: String,
}

impl Uploader {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_UPLOADER, ANONYMOUS_UPLOADER)
    }

    /// Build from optional form values, falling back to anonymous.
    pub fn from_form(id: Option<&str>, name: Option<&str>) -> Self {
        let id = id.map(str::trim).filter(|s| !s.is_empty());
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        match (id, name) {
            (Some(id), Some(name)) => Self::new(id, name),
            (Some(id), None) => Self::new(id, id),
            (None, Some(name)) => Self::new(ANONYMOUS_UPLOADER, name),
            (None, None) => Self::anonymous(),
        }
    }
}

/// Files sharing one set of tags and one uploader.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub files: Vec<UploadFile>,
    pub tags: Vec<String>,
    pub uploader: Uploader,
}

impl UploadBatch {
    /// Pair files with hashes by position.
    ///
    /// Files beyond the number of hashes get no hash; blank hashes count as
    /// missing.
    pub fn pair(
        files: Vec<(String, Bytes)>,
        hashes: Vec<String>,
        tags: Vec<String>,
        uploader: Uploader,
    ) -> Self {
        let mut hashes = hashes.into_iter();
        let files = files
            .into_iter()
            .map(|(file_name, data)| UploadFile {
                file_name,
                data,
                hash: hashes
                    .next()
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty()),
            })
            .collect();

        Self {
            files,
            tags,
            uploader,
        }
    }
}

/// Outcome of a fully stored batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub stored: Vec<PhotoRecord>,
}

/// Detected image type of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub extension: &'static str,
    pub content_type: &'static str,
}

/// Recognize the image format from the leading bytes.
pub fn detect_image(data: &[u8]) -> Option<ImageKind> {
    let format = image::guess_format(data).ok()?;
    let (extension, content_type) = match format {
        ImageFormat::Jpeg => ("jpg", "image/jpeg"),
        ImageFormat::Png => ("png", "image/png"),
        ImageFormat::Gif => ("gif", "image/gif"),
        ImageFormat::WebP => ("webp", "image/webp"),
        ImageFormat::Bmp => ("bmp", "image/bmp"),
        ImageFormat::Tiff => ("tiff", "image/tiff"),
        ImageFormat::Avif => ("avif", "image/avif"),
        _ => return None,
    };
    Some(ImageKind {
        extension,
        content_type,
    })
}

/// Check a whole batch before anything is stored.
///
/// Returns the detected image kind of every file, in order.
pub fn validate_batch(
    batch: &UploadBatch,
    vocabulary: &TagVocabulary,
) -> Result<Vec<ImageKind>, GalleryError> {
    if batch.files.is_empty() {
        return Err(GalleryError::validation("Please choose a file to upload"));
    }

    if let Some(tag) = vocabulary.first_unknown(&batch.tags) {
        return Err(GalleryError::validation(format!("Unknown tag: {}", tag)));
    }

    let mut kinds = Vec::with_capacity(batch.files.len());
    for file in &batch.files {
        let label = display_name(&file.file_name);

        if file.data.is_empty() {
            return Err(GalleryError::validation(format!("File {} is empty", label)));
        }
        if file.hash.is_none() {
            return Err(GalleryError::validation(format!(
                "No content hash was sent for {}",
                label
            )));
        }
        let kind = detect_image(&file.data).ok_or_else(|| {
            GalleryError::validation(format!("File {} is not a supported image", label))
        })?;
        kinds.push(kind);
    }

    Ok(kinds)
}

fn display_name(file_name: &str) -> &str {
    if file_name.is_empty() {
        "(unnamed)"
    } else {
        file_name
    }
}

/// Whether a stored URL can be served back to browsers.
pub fn is_resolvable_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Object key for an upload: `<prefix>/<stem>-<unix millis>.<ext>`.
pub fn object_key(prefix: &str, file_name: &str, extension: &str, time: &DateTime<Utc>) -> String {
    let stem = sanitize_stem(file_name);
    let prefix = prefix.trim_matches('/');
    let name = format!("{}-{}.{}", stem, time.timestamp_millis(), extension);
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// File name without directories or extension, reduced to `[A-Za-z0-9_-]`.
fn sanitize_stem(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let mut out = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
        if out.len() >= MAX_STEM_LEN {
            break;
        }
    }

    let out = out.trim_matches('-').to_string();
    if out.is_empty() {
        "photo".to_string()
    } else {
        out
    }
}

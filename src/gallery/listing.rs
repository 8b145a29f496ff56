//! Tag filtering and pagination over the full photo collection.
//!
//! The document store cannot evaluate "has all of these tags" together with
//! the upload-time ordering, so the whole collection is fetched in order and
//! filtered and sliced here.

use url::form_urlencoded;

use super::record::PhotoRecord;
use super::tags::normalize_tags;

/// Default number of photos per gallery page.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Which slice of the gallery to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Tags every shown photo must carry
    pub tags: Vec<String>,

    /// 1-based page number as requested (not yet clamped)
    pub page: usize,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            page: 1,
        }
    }
}

impl ListingQuery {
    pub fn new(tags: Vec<String>, page: usize) -> Self {
        Self {
            tags: normalize_tags(tags),
            page: page.max(1),
        }
    }

    /// Parse a raw query string.
    ///
    /// `tags` may repeat or hold comma-separated values. A missing, zero or
    /// non-numeric `page` means page 1.
    pub fn from_query_string(query: &str) -> Self {
        let mut tags: Vec<String> = Vec::new();
        let mut page = 1;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tags" | "tag" => tags.push(value.into_owned()),
                "page" => page = value.trim().parse::<usize>().unwrap_or(1),
                _ => {}
            }
        }

        Self::new(tags, page)
    }
}

/// One rendered page of the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPage {
    /// Photos on this page, newest first
    pub photos: Vec<PhotoRecord>,

    /// Current page after clamping (always at least 1)
    pub page: usize,

    /// `ceil(total_photos / page_size)`, zero when nothing matched
    pub total_pages: usize,

    /// Number of photos matching the filter across all pages
    pub total_photos: usize,

    /// Tags the listing was filtered by
    pub active_tags: Vec<String>,
}

impl GalleryPage {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn is_tag_active(&self, tag: &str) -> bool {
        self.active_tags.iter().any(|t| t == tag)
    }
}

/// Keep only photos carrying every tag in `required`, preserving order.
pub fn filter_by_tags(photos: Vec<PhotoRecord>, required: &[String]) -> Vec<PhotoRecord> {
    if required.is_empty() {
        return photos;
    }
    photos
        .into_iter()
        .filter(|photo| photo.has_all_tags(required))
        .collect()
}

/// Number of pages needed for `len` items.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Clamp a requested page into `[1, max(total_pages, 1)]`.
pub fn clamp_page(requested: usize, total_pages: usize) -> usize {
    requested.clamp(1, total_pages.max(1))
}

/// Filter an ordered collection and cut out the requested page.
pub fn paginate(photos: Vec<PhotoRecord>, query: &ListingQuery, page_size: usize) -> GalleryPage {
    let page_size = page_size.max(1);
    let filtered = filter_by_tags(photos, &query.tags);

    let total_photos = filtered.len();
    let total_pages = page_count(total_photos, page_size);
    let page = clamp_page(query.page, total_pages);

    let photos = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    GalleryPage {
        photos,
        page,
        total_pages,
        total_photos,
        active_tags: query.tags.clone(),
    }
}

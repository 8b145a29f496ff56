//! One-off rewrite of legacy scalar `tags` fields into arrays.

use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::DocumentStore;

use super::tags::normalize_tags;

/// A record whose tags were (or would be) rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRewrite {
    pub id: String,
    pub before: String,
    pub after: Vec<String>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records found with scalar tags
    pub rewrites: Vec<TagRewrite>,

    /// Whether the rewrites were only reported
    pub dry_run: bool,
}

impl MigrationReport {
    /// Number of records updated (zero for a dry run).
    pub fn updated(&self) -> usize {
        if self.dry_run {
            0
        } else {
            self.rewrites.len()
        }
    }
}

/// Rewrite every scalar `tags` field into an array.
///
/// Older uploads joined tags with `", "`, so the string is split on commas
/// to recover the original list. Only the `tags` field is written.
pub async fn migrate_scalar_tags(
    store: &dyn DocumentStore,
    dry_run: bool,
) -> Result<MigrationReport, StoreError> {
    let legacy = store.scalar_tag_photos().await?;
    info!(found = legacy.len(), dry_run, "Scanned photo collection for scalar tags");

    let mut report = MigrationReport {
        rewrites: Vec::with_capacity(legacy.len()),
        dry_run,
    };

    for record in legacy {
        let tags = normalize_tags([record.value.as_str()]);
        if dry_run {
            debug!(id = %record.id, before = %record.value, after = ?tags, "Would rewrite tags");
        } else {
            store.set_photo_tags(&record.id, &tags).await?;
            debug!(id = %record.id, after = ?tags, "Rewrote tags");
        }
        report.rewrites.push(TagRewrite {
            id: record.id,
            before: record.value,
            after: tags,
        });
    }

    Ok(report)
}

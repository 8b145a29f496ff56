//! Tag vocabulary and tag-list parsing.
//!
//! The vocabulary is an ordered JSON array of strings loaded once at startup:
//!
//! ```json
//! ["sunset", "portrait", "street"]
//! ```

use std::path::Path;

use thiserror::Error;

/// Errors raised while loading the tag vocabulary.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Failed to read tag file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tag file {path} is not a JSON array of strings: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tag file contains an empty tag")]
    EmptyTag,

    #[error("Tag file lists '{0}' more than once")]
    DuplicateTag(String),

    /// Tag lists are comma-separated in queries and forms
    #[error("Tag '{0}' must not contain a comma")]
    InvalidTag(String),
}

/// The fixed, ordered set of tags users may assign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagVocabulary {
    tags: Vec<String>,
}

impl TagVocabulary {
    /// Build a vocabulary from an ordered list.
    ///
    /// Tags are trimmed; blanks, repeats and tags containing a comma are
    /// rejected.
    pub fn new<I, T>(tags: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.into().trim().to_string();
            if tag.is_empty() {
                return Err(VocabularyError::EmptyTag);
            }
            if tag.contains(',') {
                return Err(VocabularyError::InvalidTag(tag));
            }
            if out.contains(&tag) {
                return Err(VocabularyError::DuplicateTag(tag));
            }
            out.push(tag);
        }
        Ok(Self { tags: out })
    }

    /// Parse a vocabulary from JSON text.
    pub fn from_json(json: &str, path: &str) -> Result<Self, VocabularyError> {
        let tags: Vec<String> = serde_json::from_str(json).map_err(|source| VocabularyError::Parse {
            path: path.to_string(),
            source,
        })?;
        Self::new(tags)
    }

    /// Load a vocabulary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| VocabularyError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&json, &display)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Return the first tag in `tags` that is not part of the vocabulary.
    pub fn first_unknown<'a>(&self, tags: &'a [String]) -> Option<&'a str> {
        tags.iter()
            .map(String::as_str)
            .find(|tag| !self.contains(tag))
    }
}

/// Normalize a list of raw tag values.
///
/// Each value may hold several comma-separated tags. Values are trimmed,
/// blanks dropped and repeats collapsed, keeping first-seen order.
pub fn normalize_tags<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        for part in value.as_ref().split(',') {
            let tag = part.trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
    }
    out
}

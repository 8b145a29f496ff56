//! Firestore REST wire format.
//!
//! Firestore wraps every field in a typed value object:
//!
//! ```json
//! { "fields": {
//!     "filepath":   { "stringValue": "https://cdn.example.com/a.jpg" },
//!     "tags":       { "arrayValue": { "values": [ { "stringValue": "sunset" } ] } },
//!     "upload_time":{ "stringValue": "2024-01-02T03:04:05.000Z" } } }
//! ```
//!
//! Serde's externally tagged enums map onto that shape directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::gallery::{
    format_upload_time, normalize_tags, parse_upload_time, NewPhoto, PhotoRecord, UserProfile,
};

// Photo document fields
pub const FIELD_FILEPATH: &str = "filepath";
pub const FIELD_FILE_HASH: &str = "file_hash";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_UPLOAD_TIME: &str = "upload_time";
pub const FIELD_UPLOAD_BY: &str = "upload_by";
pub const FIELD_UPLOADER_NICKNAME: &str = "uploader_nickname";

// Profile document fields
pub const FIELD_NICKNAME: &str = "nickname";
pub const FIELD_ROLE: &str = "role";

/// A typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// 64-bit integers travel as strings
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// Absent for empty arrays
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::StringValue(value.into())
    }

    pub fn string_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::ArrayValue(ArrayValue {
            values: values.into_iter().map(Value::string).collect(),
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }
}

/// A Firestore document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Full resource name, `projects/.../documents/<collection>/<id>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn with_fields(fields: BTreeMap<String, Value>) -> Self {
        Self { name: None, fields }
    }

    /// The document id (last segment of its resource name).
    pub fn id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
pub struct RunQueryItem {
    #[serde(default)]
    pub document: Option<Document>,
}

/// Error body returned by Google APIs.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub status: String,
}

// =============================================================================
// Photo documents
// =============================================================================

/// Encode a new photo into document fields.
pub fn encode_photo(photo: &NewPhoto) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert(FIELD_FILEPATH.to_string(), Value::string(&photo.filepath));
    fields.insert(FIELD_FILE_HASH.to_string(), Value::string(&photo.file_hash));
    fields.insert(FIELD_TAGS.to_string(), Value::string_array(photo.tags.iter().cloned()));
    fields.insert(
        FIELD_UPLOAD_TIME.to_string(),
        Value::string(format_upload_time(&photo.upload_time)),
    );
    fields.insert(FIELD_UPLOAD_BY.to_string(), Value::string(&photo.upload_by));
    fields.insert(
        FIELD_UPLOADER_NICKNAME.to_string(),
        Value::string(&photo.uploader_nickname),
    );
    Document::with_fields(fields)
}

/// Document body that replaces only the tags of a photo.
pub fn encode_tags(tags: &[String]) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert(FIELD_TAGS.to_string(), Value::string_array(tags.iter().cloned()));
    Document::with_fields(fields)
}

/// Decode a photo document.
///
/// Tolerates records written by older revisions: a scalar `tags` string is
/// split on commas, and missing hash or uploader fields decode as empty.
pub fn decode_photo(doc: &Document) -> Result<PhotoRecord, String> {
    let id = doc.id().ok_or("document has no name")?.to_string();

    let filepath = doc
        .get_str(FIELD_FILEPATH)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("photo {} has no filepath", id))?
        .to_string();

    let upload_time = match doc.fields.get(FIELD_UPLOAD_TIME) {
        Some(Value::StringValue(s)) | Some(Value::TimestampValue(s)) => parse_upload_time(s),
        _ => None,
    }
    .ok_or_else(|| format!("photo {} has no valid upload_time", id))?;

    let tags = match doc.fields.get(FIELD_TAGS) {
        Some(Value::ArrayValue(array)) => {
            normalize_tags(array.values.iter().filter_map(Value::as_str))
        }
        Some(Value::StringValue(s)) => normalize_tags([s.as_str()]),
        _ => Vec::new(),
    };

    let text = |field: &str| doc.get_str(field).unwrap_or_default().to_string();

    Ok(PhotoRecord {
        id,
        filepath,
        file_hash: text(FIELD_FILE_HASH),
        tags,
        upload_time,
        upload_by: text(FIELD_UPLOAD_BY),
        uploader_nickname: text(FIELD_UPLOADER_NICKNAME),
    })
}

/// The raw tag string of a photo document still using scalar tags.
pub fn scalar_tags(doc: &Document) -> Option<&str> {
    match doc.fields.get(FIELD_TAGS) {
        Some(Value::StringValue(s)) => Some(s),
        _ => None,
    }
}

// =============================================================================
// Profile documents
// =============================================================================

pub fn decode_profile(doc: &Document) -> UserProfile {
    UserProfile {
        nickname: doc.get_str(FIELD_NICKNAME).unwrap_or_default().to_string(),
        role: doc.get_str(FIELD_ROLE).map(str::to_string),
    }
}

pub fn encode_nickname(nickname: &str) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert(FIELD_NICKNAME.to_string(), Value::string(nickname));
    Document::with_fields(fields)
}

// =============================================================================
// Structured queries
// =============================================================================

/// Query returning a whole collection, optionally ordered by a field.
pub fn collection_query(collection: &str, order_desc_by: Option<&str>) -> serde_json::Value {
    let mut query = json!({
        "from": [{ "collectionId": collection }],
    });
    if let Some(field) = order_desc_by {
        query["orderBy"] = json!([{
            "field": { "fieldPath": field },
            "direction": "DESCENDING",
        }]);
    }
    json!({ "structuredQuery": query })
}

/// Query returning at most one document whose string field equals `value`.
pub fn field_equals_query(collection: &str, field: &str, value: &str) -> serde_json::Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": { "stringValue": value },
                }
            },
            "limit": 1,
        }
    })
}

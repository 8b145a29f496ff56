//! Firestore-backed document store over the REST API.
//!
//! Photo records live in one collection, user profiles in another. Reads
//! use `runQuery`; the photo insert is a create with an explicit document id
//! so Firestore itself rejects a second record for the same content hash.

pub mod value;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::gallery::{NewPhoto, PhotoRecord, ScalarTags, UserProfile};

use super::{DocumentStore, InsertOutcome};
use value::{
    collection_query, decode_photo, decode_profile, encode_nickname, encode_photo, encode_tags,
    field_equals_query, scalar_tags, Document, ErrorEnvelope, RunQueryItem, FIELD_FILE_HASH,
    FIELD_NICKNAME, FIELD_TAGS, FIELD_UPLOAD_TIME,
};

/// Default Firestore REST endpoint.
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Default database id.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Default collection holding photo records.
pub const DEFAULT_PHOTOS_COLLECTION: &str = "photos";

/// Default collection holding user profiles.
pub const DEFAULT_USERS_COLLECTION: &str = "users";

/// Connection settings for [`FirestoreStore`].
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// REST endpoint, e.g. `https://firestore.googleapis.com/v1` or an emulator
    pub endpoint: String,

    pub project_id: String,

    pub database: String,

    /// OAuth2 bearer token; omitted when talking to the emulator
    pub access_token: Option<String>,

    pub photos_collection: String,

    pub users_collection: String,

    /// Timeout applied to every request
    pub timeout: Duration,
}

impl FirestoreConfig {
    /// Settings for a project with default endpoint, database and collections.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_FIRESTORE_ENDPOINT.to_string(),
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
            access_token: None,
            photos_collection: DEFAULT_PHOTOS_COLLECTION.to_string(),
            users_collection: DEFAULT_USERS_COLLECTION.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Base URL of the document tree.
    pub fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }

    /// URL of a collection.
    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url(), collection)
    }

    /// URL of a single document.
    pub fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }
}

/// Document store backed by Firestore.
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    /// Create a store with its own HTTP client.
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("webpics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Request(format!("client build failed: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        builder
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))
    }

    /// Run a structured query and return the matching documents.
    async fn run_query(&self, query: serde_json::Value) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.config.documents_url());
        let response = self
            .send(self.request(Method::POST, &url).json(&query))
            .await?;
        let response = ensure_success(response).await?;

        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let url = self.config.document_url(collection, id);
        let response = self.send(self.request(Method::GET, &url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Write `fields` of a document, leaving other fields as they are.
    async fn patch_fields(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        body: &Document,
        must_exist: bool,
    ) -> Result<(), StoreError> {
        let url = self.config.document_url(collection, id);
        let mut query = vec![("updateMask.fieldPaths", field.to_string())];
        if must_exist {
            query.push(("currentDocument.exists", "true".to_string()));
        }
        let response = self
            .send(self.request(Method::PATCH, &url).query(&query).json(body))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into a [`StoreError::Status`].
async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| {
            if envelope.error.status.is_empty() {
                envelope.error.message
            } else {
                format!("{} ({})", envelope.error.message, envelope.error.status)
            }
        })
        .unwrap_or(body);

    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Decode photo documents, skipping malformed ones.
fn decode_photos(documents: &[Document]) -> Vec<PhotoRecord> {
    documents
        .iter()
        .filter_map(|doc| match decode_photo(doc) {
            Ok(photo) => Some(photo),
            Err(reason) => {
                warn!("Skipping malformed photo document: {}", reason);
                None
            }
        })
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_photos(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        let documents = self
            .run_query(collection_query(
                &self.config.photos_collection,
                Some(FIELD_UPLOAD_TIME),
            ))
            .await?;
        debug!(count = documents.len(), "Fetched photo collection");
        Ok(decode_photos(&documents))
    }

    async fn find_photo_by_hash(
        &self,
        file_hash: &str,
    ) -> Result<Option<PhotoRecord>, StoreError> {
        let documents = self
            .run_query(field_equals_query(
                &self.config.photos_collection,
                FIELD_FILE_HASH,
                file_hash,
            ))
            .await?;
        Ok(decode_photos(&documents).into_iter().next())
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<InsertOutcome, StoreError> {
        let id = photo.document_id();
        let url = self.config.collection_url(&self.config.photos_collection);
        let response = self
            .send(
                self.request(Method::POST, &url)
                    .query(&[("documentId", id.as_str())])
                    .json(&encode_photo(photo)),
            )
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(id = %id, "Photo document already exists");
            return Ok(InsertOutcome::AlreadyExists);
        }
        ensure_success(response).await?;

        Ok(InsertOutcome::Created(photo.clone().into_record(id)))
    }

    async fn delete_photo(&self, id: &str) -> Result<bool, StoreError> {
        let url = self
            .config
            .document_url(&self.config.photos_collection, id);
        let response = self
            .send(
                self.request(Method::DELETE, &url)
                    .query(&[("currentDocument.exists", "true")]),
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn scalar_tag_photos(&self) -> Result<Vec<ScalarTags>, StoreError> {
        let documents = self
            .run_query(collection_query(&self.config.photos_collection, None))
            .await?;

        Ok(documents
            .iter()
            .filter_map(|doc| {
                let id = doc.id()?;
                scalar_tags(doc).map(|value| ScalarTags {
                    id: id.to_string(),
                    value: value.to_string(),
                })
            })
            .collect())
    }

    async fn set_photo_tags(&self, id: &str, tags: &[String]) -> Result<(), StoreError> {
        self.patch_fields(
            &self.config.photos_collection,
            id,
            FIELD_TAGS,
            &encode_tags(tags),
            true,
        )
        .await
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        let document = self
            .get_document(&self.config.users_collection, uid)
            .await?;
        Ok(document.as_ref().map(decode_profile))
    }

    async fn find_uid_by_nickname(&self, nickname: &str) -> Result<Option<String>, StoreError> {
        let documents = self
            .run_query(field_equals_query(
                &self.config.users_collection,
                FIELD_NICKNAME,
                nickname,
            ))
            .await?;
        Ok(documents
            .iter()
            .find_map(|doc| doc.id().map(str::to_string)))
    }

    async fn set_nickname(&self, uid: &str, nickname: &str) -> Result<(), StoreError> {
        self.patch_fields(
            &self.config.users_collection,
            uid,
            FIELD_NICKNAME,
            &encode_nickname(nickname),
            false,
        )
        .await
    }
}

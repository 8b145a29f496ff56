use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::BlobStore;
use crate::error::BlobError;

/// S3-backed implementation of `BlobStore`.
///
/// Writes objects to a bucket in S3 or S3-compatible storage (MinIO, R2, etc.)
/// and reports them under a public base URL, usually a CDN or the bucket's
/// website endpoint.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore.
    ///
    /// # Arguments
    /// * `client` - AWS S3 client to use for requests
    /// * `bucket` - Bucket receiving the uploads
    /// * `public_base_url` - URL prefix the objects are served from
    pub fn new(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Served URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<String, BlobError> {
        let len = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                // Requests that never produced a response are connection failures
                if e.raw_response().is_none() {
                    BlobError::Connection(e.to_string())
                } else {
                    BlobError::S3(e.to_string())
                }
            })?;

        debug!(bucket = %self.bucket, key, bytes = len, "Stored object");

        Ok(self.public_url(key))
    }
}

/// Default public URL for a bucket when none is configured.
///
/// Uses the virtual-hosted AWS URL, or `<endpoint>/<bucket>` for custom
/// endpoints (path-style, as MinIO serves it).
pub fn default_public_base_url(bucket: &str, region: &str, endpoint_url: Option<&str>) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}

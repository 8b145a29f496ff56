//! Configuration management for WebPics.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with the `WEBPICS_` prefix (plus `PORT`)
//! - Defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `WEBPICS_HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 3000)
//! - `WEBPICS_TAGS_FILE` - Tag vocabulary JSON file (default: tags.json)
//! - `WEBPICS_PAGE_SIZE` - Photos per gallery page (default: 12)
//! - `WEBPICS_S3_BUCKET` - Bucket receiving uploads (required)
//! - `WEBPICS_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `WEBPICS_S3_REGION` - AWS region (default: us-east-1)
//! - `WEBPICS_S3_PREFIX` - Object key prefix (default: webpics)
//! - `WEBPICS_PUBLIC_URL` - Base URL uploaded objects are served from
//! - `WEBPICS_FIRESTORE_PROJECT` - Firestore project id (required)
//! - `WEBPICS_FIRESTORE_TOKEN` - OAuth2 access token for Firestore
//! - `WEBPICS_FIREBASE_API_KEY` - Firebase web API key (required)
//! - `WEBPICS_SESSION_SECRET` - HMAC secret for session cookies (required)
//! - `WEBPICS_ADMIN_ROLE` - Profile role granting admin rights (default: admin)
//! - `WEBPICS_DISPLAY_UTC_OFFSET` - Hours added to UTC when showing times (default: 9)

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand};

use crate::gallery::{DEFAULT_ADMIN_ROLE, DEFAULT_KEY_PREFIX, DEFAULT_PAGE_SIZE};
use crate::server::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SESSION_TTL};
use crate::store::{
    default_public_base_url, FirestoreConfig, DEFAULT_DATABASE, DEFAULT_FIRESTORE_ENDPOINT,
    DEFAULT_IDENTITY_ENDPOINT, DEFAULT_PHOTOS_COLLECTION, DEFAULT_USERS_COLLECTION,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default tag vocabulary file.
pub const DEFAULT_TAGS_FILE: &str = "tags.json";

/// Default timeout for calls to the remote services, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default display offset from UTC, in hours.
pub const DEFAULT_DISPLAY_UTC_OFFSET: i32 = 9;

/// Shortest accepted session secret.
const MIN_SESSION_SECRET_LEN: usize = 16;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WebPics - a tag-filtered photo gallery.
#[derive(Parser, Debug, Clone)]
#[command(name = "webpics")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the web server.
    Serve(ServeConfig),

    /// Rewrite legacy scalar `tags` fields into arrays.
    MigrateTags(MigrateConfig),
}

/// Document store settings shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct FirestoreArgs {
    /// Firestore project id.
    #[arg(long, env = "WEBPICS_FIRESTORE_PROJECT")]
    pub firestore_project: Option<String>,

    /// Firestore REST endpoint (point at the emulator for local development).
    #[arg(long, default_value = DEFAULT_FIRESTORE_ENDPOINT, env = "WEBPICS_FIRESTORE_ENDPOINT")]
    pub firestore_endpoint: String,

    /// Firestore database id.
    #[arg(long, default_value = DEFAULT_DATABASE, env = "WEBPICS_FIRESTORE_DATABASE")]
    pub firestore_database: String,

    /// OAuth2 access token sent as a bearer token.
    #[arg(long, env = "WEBPICS_FIRESTORE_TOKEN", hide_env_values = true)]
    pub firestore_token: Option<String>,

    /// Collection holding photo records.
    #[arg(long, default_value = DEFAULT_PHOTOS_COLLECTION, env = "WEBPICS_PHOTOS_COLLECTION")]
    pub photos_collection: String,

    /// Collection holding user profiles.
    #[arg(long, default_value = DEFAULT_USERS_COLLECTION, env = "WEBPICS_USERS_COLLECTION")]
    pub users_collection: String,

    /// Timeout for calls to the remote services, in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "WEBPICS_REQUEST_TIMEOUT")]
    pub request_timeout: u64,
}

impl FirestoreArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.project().is_empty() {
            return Err(
                "Firestore project is required. Set --firestore-project or WEBPICS_FIRESTORE_PROJECT"
                    .to_string(),
            );
        }
        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Project id, empty when unset (call validate() first).
    pub fn project(&self) -> &str {
        self.firestore_project.as_deref().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Settings for the Firestore client.
    pub fn store_config(&self) -> FirestoreConfig {
        FirestoreConfig {
            endpoint: self.firestore_endpoint.clone(),
            project_id: self.project().to_string(),
            database: self.firestore_database.clone(),
            access_token: self.firestore_token.clone(),
            photos_collection: self.photos_collection.clone(),
            users_collection: self.users_collection.clone(),
            timeout: self.timeout(),
        }
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WEBPICS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Directory served under /static.
    #[arg(long, env = "WEBPICS_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Largest accepted upload request, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "WEBPICS_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Gallery Configuration
    // =========================================================================
    /// JSON file with the array of allowed tags.
    #[arg(long, default_value = DEFAULT_TAGS_FILE, env = "WEBPICS_TAGS_FILE")]
    pub tags_file: PathBuf,

    /// Photos per gallery page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, env = "WEBPICS_PAGE_SIZE")]
    pub page_size: usize,

    /// Hours added to UTC when showing upload times.
    #[arg(
        long,
        default_value_t = DEFAULT_DISPLAY_UTC_OFFSET,
        env = "WEBPICS_DISPLAY_UTC_OFFSET",
        allow_negative_numbers = true
    )]
    pub display_utc_offset: i32,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// S3 bucket receiving uploaded images.
    #[arg(long, env = "WEBPICS_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "WEBPICS_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "WEBPICS_S3_REGION")]
    pub s3_region: String,

    /// Prefix for uploaded object keys.
    #[arg(long, default_value = DEFAULT_KEY_PREFIX, env = "WEBPICS_S3_PREFIX")]
    pub s3_prefix: String,

    /// Base URL uploaded objects are served from.
    ///
    /// Defaults to the bucket URL derived from region or endpoint.
    #[arg(long, env = "WEBPICS_PUBLIC_URL")]
    pub public_url: Option<String>,

    // =========================================================================
    // Document Store Configuration
    // =========================================================================
    #[command(flatten)]
    pub firestore: FirestoreArgs,

    // =========================================================================
    // Accounts Configuration
    // =========================================================================
    /// Firebase web API key for the identity provider.
    #[arg(long, env = "WEBPICS_FIREBASE_API_KEY", hide_env_values = true)]
    pub firebase_api_key: Option<String>,

    /// Identity Toolkit REST endpoint.
    #[arg(long, default_value = DEFAULT_IDENTITY_ENDPOINT, env = "WEBPICS_IDENTITY_ENDPOINT")]
    pub identity_endpoint: String,

    /// Secret key for HMAC-SHA256 session cookies.
    #[arg(long, env = "WEBPICS_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL.as_secs(), env = "WEBPICS_SESSION_TTL")]
    pub session_ttl: u64,

    /// Mark session cookies Secure (serve over HTTPS).
    #[arg(long, default_value_t = false, env = "WEBPICS_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Profile role value granting administrator rights.
    #[arg(long, default_value = DEFAULT_ADMIN_ROLE, env = "WEBPICS_ADMIN_ROLE")]
    pub admin_role: String,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins for the JSON endpoints (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WEBPICS_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket().is_empty() {
            return Err(
                "S3 bucket name is required. Set --s3-bucket or WEBPICS_S3_BUCKET".to_string(),
            );
        }

        self.firestore.validate()?;

        if self
            .firebase_api_key
            .as_deref()
            .unwrap_or_default()
            .is_empty()
        {
            return Err(
                "Firebase API key is required. Set --firebase-api-key or WEBPICS_FIREBASE_API_KEY"
                    .to_string(),
            );
        }

        match self.session_secret.as_deref() {
            None | Some("") => {
                return Err(
                    "Session secret is required. Set --session-secret or WEBPICS_SESSION_SECRET"
                        .to_string(),
                )
            }
            Some(secret) if secret.len() < MIN_SESSION_SECRET_LEN => {
                return Err(format!(
                    "session_secret must be at least {} characters",
                    MIN_SESSION_SECRET_LEN
                ))
            }
            Some(_) => {}
        }

        if self.session_ttl == 0 {
            return Err("session_ttl must be greater than 0".to_string());
        }

        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }

        if self.display_offset().is_none() {
            return Err("display_utc_offset must be between -12 and 14 hours".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        if self.admin_role.trim().is_empty() {
            return Err("admin_role must not be empty".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bucket name, empty when unset (call validate() first).
    pub fn bucket(&self) -> &str {
        self.s3_bucket.as_deref().unwrap_or_default()
    }

    pub fn firebase_api_key_or_empty(&self) -> &str {
        self.firebase_api_key.as_deref().unwrap_or_default()
    }

    pub fn session_secret_or_empty(&self) -> &str {
        self.session_secret.as_deref().unwrap_or_default()
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }

    /// Display time zone, `None` if the offset is out of range.
    pub fn display_offset(&self) -> Option<FixedOffset> {
        if !(-12..=14).contains(&self.display_utc_offset) {
            return None;
        }
        FixedOffset::east_opt(self.display_utc_offset * 3600)
    }

    /// Base URL uploaded objects are served from.
    pub fn public_base_url(&self) -> String {
        match &self.public_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => default_public_base_url(
                self.bucket(),
                &self.s3_region,
                self.s3_endpoint.as_deref(),
            ),
        }
    }
}

/// Configuration for the `migrate-tags` command.
#[derive(Args, Debug, Clone)]
pub struct MigrateConfig {
    #[command(flatten)]
    pub firestore: FirestoreArgs,

    /// Report the records that would change without writing.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl MigrateConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.firestore.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

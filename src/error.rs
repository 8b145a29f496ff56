use thiserror::Error;

/// Errors returned by the remote document store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The request could not be sent or timed out
    #[error("Document store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status
    #[error("Document store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Failed to decode document store response: {0}")]
    Decode(String),
}

/// Errors returned by the object store hosting image bytes.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors returned by the identity provider.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account
    #[error("An account with this email already exists")]
    EmailExists,

    /// The provider refused the request for a user-facing reason
    /// (weak password, malformed email, disabled account)
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or answered unexpectedly
    #[error("Identity provider request failed: {0}")]
    Request(String),
}

impl IdentityError {
    /// Whether this error is caused by what the user typed, as opposed to an
    /// upstream failure.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, IdentityError::Request(_))
    }
}

/// Errors produced by the gallery and account services.
#[derive(Debug, Clone, Error)]
pub enum GalleryError {
    /// Input rejected before or during processing (missing file, missing
    /// hash, unresolvable URL, unknown tag, nickname problems)
    #[error("{0}")]
    Validation(String),

    /// A record with this content hash already exists
    #[error("Duplicate upload: a photo with hash {hash} already exists ({stored} file(s) of this batch were stored before it)")]
    Duplicate { hash: String, stored: usize },

    /// No valid session
    #[error("Sign-in required")]
    Unauthorized,

    /// Valid session without the required role
    #[error("Administrator role required")]
    Forbidden,

    /// Record or profile does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Object store failure
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// Identity provider failure
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl GalleryError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        GalleryError::Validation(message.into())
    }

    /// Whether the error should be shown inline on the originating form.
    pub fn is_form_error(&self) -> bool {
        match self {
            GalleryError::Validation(_) | GalleryError::Duplicate { .. } => true,
            GalleryError::Identity(err) => err.is_user_error(),
            _ => false,
        }
    }

    /// Whether the error comes from one of the remote services.
    pub fn is_upstream(&self) -> bool {
        match self {
            GalleryError::Store(_) | GalleryError::Blob(_) => true,
            GalleryError::Identity(err) => !err.is_user_error(),
            _ => false,
        }
    }
}

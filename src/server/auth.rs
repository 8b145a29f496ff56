//! Signed session cookies for WebPics.
//!
//! After a successful sign-in the server issues a session token bound to the
//! user id and an expiry, signed with HMAC-SHA256:
//!
//! ```text
//! token     = "{hex(uid)}.{expiry}.{signature}"
//! signature = HMAC-SHA256(secret_key, "{hex(uid)}.{expiry}")
//! ```
//!
//! The token travels in an `HttpOnly`, `SameSite=Lax` cookie. Handlers
//! receive the verified user through the [`CurrentUser`], [`MaybeUser`] and
//! [`AdminUser`] extractors, which also load the profile so role checks
//! happen on the server.
//!
//! # Example
//!
//! ```rust
//! use webpics::server::auth::SessionSigner;
//! use std::time::Duration;
//!
//! let signer = SessionSigner::new("my-secret-key", Duration::from_secs(3600));
//! let token = signer.issue("user-1");
//! assert_eq!(signer.verify(&token).unwrap().uid, "user-1");
//! ```

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::{AppState, PageError};
use crate::error::GalleryError;
use crate::gallery::UserProfile;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "webpics_session";

/// Default session lifetime (7 days).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Session token verification errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is not `uid.expiry.signature`
    Malformed,

    /// Session has expired
    Expired {
        /// When the session expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Malformed => write!(f, "Malformed session token"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Session expired at {} (current time: {})",
                expired_at, current_time
            ),
            AuthError::InvalidSignature => write!(f, "Invalid session signature"),
        }
    }
}

impl std::error::Error for AuthError {}

/// A verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,

    /// Unix timestamp when the session stops being valid
    pub expires_at: u64,
}

// =============================================================================
// Session Signer
// =============================================================================

/// Issues and verifies session tokens and builds the cookies carrying them.
#[derive(Clone)]
pub struct SessionSigner {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,

    ttl: Duration,

    /// Whether cookies get the `Secure` attribute
    secure: bool,
}

impl SessionSigner {
    /// Create a signer.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - The secret key used for HMAC computation. Should be
    ///   at least 32 bytes.
    /// * `ttl` - How long an issued session stays valid
    pub fn new(secret_key: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl,
            secure: false,
        }
    }

    /// Mark cookies `Secure` (HTTPS only).
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `uid` valid for the configured TTL.
    pub fn issue(&self, uid: &str) -> String {
        self.issue_with_expiry(uid, now_secs() + self.ttl.as_secs())
    }

    /// Issue a token with a specific expiry timestamp.
    pub fn issue_with_expiry(&self, uid: &str, expiry: u64) -> String {
        let uid_hex = hex::encode(uid.as_bytes());
        let signature = self.compute_signature(&uid_hex, expiry);
        format!("{}.{}.{}", uid_hex, expiry, signature)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        self.verify_at(token, now_secs())
    }

    /// Verify a token as of `current_time`.
    pub fn verify_at(&self, token: &str, current_time: u64) -> Result<Session, AuthError> {
        let mut parts = token.split('.');
        let (Some(uid_hex), Some(expiry), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };

        let expiry: u64 = expiry.parse().map_err(|_| AuthError::Malformed)?;
        let provided_sig = hex::decode(signature).map_err(|_| AuthError::Malformed)?;

        let expected_sig = hex::decode(self.compute_signature(uid_hex, expiry))
            .map_err(|_| AuthError::Malformed)?;

        // Constant-time comparison
        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            return Err(AuthError::InvalidSignature);
        }

        if current_time > expiry {
            return Err(AuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        let uid = hex::decode(uid_hex)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .filter(|uid| !uid.is_empty())
            .ok_or(AuthError::Malformed)?;

        Ok(Session {
            uid,
            expires_at: expiry,
        })
    }

    fn compute_signature(&self, uid_hex: &str, expiry: u64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(format!("{}.{}", uid_hex, expiry).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// `Set-Cookie` value carrying a session token.
    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.ttl.as_secs())
    }

    /// `Set-Cookie` value removing the session.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Value of a cookie from the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// =============================================================================
// Session Resolution
// =============================================================================

/// The signed-in user of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub uid: String,

    /// Stored profile, if one exists
    pub profile: Option<UserProfile>,

    /// Whether the profile carries the administrator role
    pub is_admin: bool,
}

impl CurrentUser {
    /// Name to show for this user: the nickname, or the uid without one.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .map(|p| p.nickname.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.uid)
    }
}

/// Verify the session cookie of a request and load the user's profile.
///
/// A missing, tampered or expired cookie resolves to `None`; a profile
/// lookup failure is an error.
pub async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<CurrentUser>, GalleryError> {
    let Some(token) = cookie_value(headers, SESSION_COOKIE) else {
        return Ok(None);
    };

    let session = match state.sessions.verify(&token) {
        Ok(session) => session,
        Err(err @ AuthError::InvalidSignature) => {
            warn!("Rejected session cookie: {}", err);
            return Ok(None);
        }
        Err(err) => {
            debug!("Ignoring session cookie: {}", err);
            return Ok(None);
        }
    };

    let profile = state.accounts.profile(&session.uid).await?;
    let is_admin = profile
        .as_ref()
        .is_some_and(|p| p.has_role(state.accounts.admin_role()));

    Ok(Some(CurrentUser {
        uid: session.uid,
        profile,
        is_admin,
    }))
}

// =============================================================================
// Axum Extractors
// =============================================================================

/// Extractor for the optional signed-in user.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve_session(state, &parts.headers).await?))
    }
}

/// Extractor requiring a signed-in user. Rejects with a redirect to the
/// sign-in page.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_session(state, &parts.headers)
            .await?
            .ok_or(PageError(GalleryError::Unauthorized))
    }
}

/// Extractor requiring a signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            warn!(uid = %user.uid, "Non-administrator attempted an admin action");
            return Err(PageError(GalleryError::Forbidden));
        }
        Ok(AdminUser(user))
    }
}

// =============================================================================
// Tests
// =============================================================================

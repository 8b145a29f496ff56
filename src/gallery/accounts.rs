//! Account operations: sign-up, sign-in and profile nicknames.

use std::sync::Arc;

use tracing::info;

use crate::error::GalleryError;
use crate::store::{DocumentStore, Identity, IdentityProvider};

use super::record::{UserProfile, DEFAULT_ADMIN_ROLE};

/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_CHARS: usize = 30;

/// Account operations over the identity provider and the profile documents.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    admin_role: String,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            store,
            admin_role: DEFAULT_ADMIN_ROLE.to_string(),
        }
    }

    /// Set the role value that grants administrator rights.
    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.admin_role = role.into();
        self
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    /// Create an account and its profile.
    ///
    /// The nickname is checked before the account is created so a taken
    /// nickname never leaves an orphaned account behind.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        nickname: &str,
    ) -> Result<Identity, GalleryError> {
        let email = require_email(email)?;
        let password = require_password(password)?;
        let nickname = validate_nickname(nickname)?;

        if self.store.find_uid_by_nickname(&nickname).await?.is_some() {
            return Err(GalleryError::validation("nickname already in use"));
        }

        let identity = self.identity.sign_up(email, password).await?;
        self.store.set_nickname(&identity.uid, &nickname).await?;

        info!(uid = %identity.uid, nickname = %nickname, "Created account");
        Ok(identity)
    }

    /// Check credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, GalleryError> {
        let email = require_email(email)?;
        let password = require_password(password)?;
        let identity = self.identity.sign_in(email, password).await?;
        info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    /// The stored profile of a user, if any.
    pub async fn profile(&self, uid: &str) -> Result<Option<UserProfile>, GalleryError> {
        Ok(self.store.get_profile(uid).await?)
    }

    /// Change a user's nickname, keeping nicknames unique.
    ///
    /// Returns the nickname as stored.
    pub async fn update_nickname(&self, uid: &str, nickname: &str) -> Result<String, GalleryError> {
        let nickname = validate_nickname(nickname)?;

        match self.store.find_uid_by_nickname(&nickname).await? {
            Some(owner) if owner != uid => {
                return Err(GalleryError::validation("nickname already in use"));
            }
            _ => {}
        }

        self.store.set_nickname(uid, &nickname).await?;
        info!(uid = %uid, nickname = %nickname, "Updated nickname");
        Ok(nickname)
    }
}

fn require_email(email: &str) -> Result<&str, GalleryError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(GalleryError::validation("Please enter your email"));
    }
    Ok(email)
}

fn require_password(password: &str) -> Result<&str, GalleryError> {
    if password.is_empty() {
        return Err(GalleryError::validation("Please enter your password"));
    }
    Ok(password)
}

/// Trim a nickname and check it is usable.
pub fn validate_nickname(raw: &str) -> Result<String, GalleryError> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(GalleryError::validation("Please enter a nickname"));
    }
    if nickname.chars().count() > MAX_NICKNAME_CHARS {
        return Err(GalleryError::validation(format!(
            "Nickname must be at most {} characters",
            MAX_NICKNAME_CHARS
        )));
    }
    Ok(nickname.to_string())
}

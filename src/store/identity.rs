//! Firebase Auth email/password identity provider over REST.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Identity, IdentityProvider};
use crate::error::IdentityError;

/// Default Identity Toolkit endpoint.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity provider backed by the Firebase Auth REST API.
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl FirebaseIdentity {
    /// Create a provider for a web API key.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("webpics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IdentityError::Request(format!("client build failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.endpoint, method)
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(self.method_url(method))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_default();
            debug!(method, status = status.as_u16(), code = %code, "Identity call rejected");
            return Err(map_error_code(status.as_u16(), &code));
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Request(format!("invalid response: {}", e)))?;

        Ok(Identity {
            uid: account.local_id,
            email: account.email,
        })
    }
}

/// Map an Identity Toolkit error code to an [`IdentityError`].
///
/// Codes look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be at
/// least 6 characters`.
fn map_error_code(status: u16, code: &str) -> IdentityError {
    let (head, detail) = match code.split_once(" : ") {
        Some((head, detail)) => (head.trim(), Some(detail.trim())),
        None => (code.trim(), None),
    };

    match head {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            IdentityError::InvalidCredentials
        }
        "WEAK_PASSWORD" => IdentityError::Rejected(
            detail
                .unwrap_or("Password is too weak")
                .to_string(),
        ),
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            IdentityError::Rejected("Please enter a valid email address".to_string())
        }
        "MISSING_PASSWORD" => IdentityError::Rejected("Please enter a password".to_string()),
        "USER_DISABLED" => IdentityError::Rejected("This account has been disabled".to_string()),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            IdentityError::Rejected("Too many attempts, please try again later".to_string())
        }
        _ if head.is_empty() => IdentityError::Request(format!("status {}", status)),
        other => IdentityError::Request(format!("status {}: {}", status, other)),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }
}

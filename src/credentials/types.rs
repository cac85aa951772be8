//! Core types for the credential store.

use serde::{Deserialize, Serialize};

/// Identity and auth material for one customer session.
///
/// Stored as `{apiKey, authToken, refreshToken, customerID}`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub api_key: String,
    pub auth_token: String,
    pub refresh_token: String,
    #[serde(rename = "customerID")]
    pub customer_id: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        auth_token: impl Into<String>,
        refresh_token: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            auth_token: auth_token.into(),
            refresh_token: refresh_token.into(),
            customer_id: customer_id.into(),
        }
    }

    /// All four fields are non-empty.
    ///
    /// Stores report an incomplete record as missing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.api_key,
            &self.auth_token,
            &self.refresh_token,
            &self.customer_id,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    /// Copy with a rotated token pair; `api_key` and `customer_id` untouched.
    #[must_use]
    pub fn with_tokens(&self, auth_token: &str, refresh_token: &str) -> Self {
        Self {
            auth_token: auth_token.to_owned(),
            refresh_token: refresh_token.to_owned(),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("customer_id", &self.customer_id)
            .finish()
    }
}

/// Errors that can occur during credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// OS keyring access failed.
    #[error("keyring access error: {0}")]
    KeyringAccess(String),

    /// No credentials are stored.
    #[error("credentials not found")]
    NotFound,

    /// The stored record could not be decoded.
    #[error("stored credentials are corrupt: {0}")]
    Corrupt(String),

    /// Backend storage failed.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<std::io::Error> for CredentialError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::InvalidData {
            Self::Corrupt(err.to_string())
        } else {
            Self::StorageError(err.to_string())
        }
    }
}

//! Error types for the geotag agent.
//!
//! Per-tick failures (location, geocoding, delivery) are recovered inside
//! the tick and only show up in [`TickOutcome`](crate::orchestrator::TickOutcome)s.
//! What reaches the caller of `start` or a background resumption is the
//! subset that makes the whole invocation meaningless: missing or unreadable
//! credentials, and a token refresh that failed while loading the session.

use crate::credentials::CredentialError;
use geoverify_api::ApiError;

/// Top-level error type for the geotag agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Location permission is not granted.
    #[error("location permission not granted: {0}")]
    Permission(String),

    /// The verification service could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The verification service rejected the request (non-auth failure).
    #[error("verification service error: {0}")]
    Remote(String),

    /// The auth token was rejected and the single retry did not help.
    #[error("authorization expired: {0}")]
    AuthExpired(String),

    /// The auth token was rejected and exchanging the refresh token failed.
    #[error("token refresh failed after '{original}': {reason}")]
    AuthRefreshFailed {
        /// Message of the authorization failure that triggered the refresh.
        original: String,
        /// Why the refresh itself failed.
        reason: String,
    },

    /// No location fix was available.
    #[error("location unavailable")]
    LocationUnavailable,

    /// Reverse geocoding failed.
    #[error("reverse geocoding failed: {0}")]
    GeocodeFailed(String),

    /// No complete credentials record is stored.
    #[error("no stored credentials")]
    CredentialsMissing,

    /// Credential store read or write failed.
    #[error("credential store error: {0}")]
    Credentials(#[from] CredentialError),

    /// Offline event cache read or write failed.
    #[error("event cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for AgentError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(message) => Self::AuthExpired(message),
            ApiError::Network(message) => Self::Network(message),
            ApiError::Http { .. } | ApiError::Decode(_) => Self::Remote(err.to_string()),
            ApiError::Config(message) => Self::Config(message),
        }
    }
}

impl AgentError {
    /// Returns `true` when retrying on a later tick may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_)
            | Self::Remote(_)
            | Self::AuthExpired(_)
            | Self::LocationUnavailable
            | Self::GeocodeFailed(_) => true,
            Self::Permission(_)
            | Self::AuthRefreshFailed { .. }
            | Self::CredentialsMissing
            | Self::Credentials(_)
            | Self::Cache(_)
            | Self::Config(_)
            | Self::Io(_) => false,
        }
    }

    /// Returns `true` for failures that must reach the caller of
    /// `start`/resumption instead of ending the session quietly.
    pub fn must_propagate(&self) -> bool {
        matches!(
            self,
            Self::AuthRefreshFailed { .. }
                | Self::CredentialsMissing
                | Self::Credentials(_)
                | Self::Io(_)
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AgentError>;

//! Error types for the geoverify-api crate.
//!
//! Messages carry the server's own `message` text or the transport error,
//! never the API key or tokens that were sent.

/// Errors that can occur while talking to the verification backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the auth token (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status (or the envelope's `statusCode` when the transport said 200).
        status: u16,
        /// Server-provided message, or the raw body if none was found.
        message: String,
    },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    /// Returns `true` for HTTP 401 responses.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Http { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) | Self::Config(_) => None,
        }
    }
}

/// Convenience type alias for geoverify-api results.
pub type Result<T> = std::result::Result<T, ApiError>;

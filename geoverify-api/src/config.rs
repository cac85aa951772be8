//! Client configuration with production defaults.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};

/// Production base URL of the verification service, including the `/v1/api` prefix.
pub const DEFAULT_BASE_URL: &str = "https://api.rd.usesourceid.com/v1/api";

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent. Defaults to `geoverify/<version>`.
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: 15,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    /// Config pointing at a different base URL (staging, mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `base_url` parses and uses `http` or `https`
    /// - `timeout_seconds` is greater than 0
    pub fn validate(&self) -> Result<(), ApiError> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "base_url must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(ApiError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

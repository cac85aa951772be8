//! Shared HTTP client construction.

use crate::config::ApiConfig;
use crate::error::ApiError;
use std::time::Duration;

/// User-Agent sent when the config does not override it.
pub fn default_user_agent() -> String {
    format!("geoverify/{}", env!("CARGO_PKG_VERSION"))
}

/// Build a [`reqwest::Client`] for the verification backend.
///
/// The client has the configured timeout and User-Agent and follows at most
/// five redirects.
///
/// # Errors
///
/// Returns [`ApiError::Config`] if the client cannot be constructed.
pub fn build_client(config: &ApiConfig) -> Result<reqwest::Client, ApiError> {
    let ua = config.user_agent.clone().unwrap_or_else(default_user_agent);

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))
}

//! Typed operations against the verification backend.
//!
//! Every method takes the key material it needs explicitly. HTTP 401 (or
//! an envelope whose `statusCode` is 401) surfaces as
//! [`ApiError::Unauthorized`] so the caller can refresh and retry once.

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::http::build_client;
use crate::types::{
    AddGeoTagRequest, CustomerRecord, Envelope, OrganisationConfig, RefreshTokenBody,
    RefreshTokenRequest, TokenPair,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

const PATH_ORG_CONFIG: &str = "organization/address-verification-config";
const PATH_HISTORY: &str = "customer/address-history";
const PATH_ADD_GEOTAG: &str = "customer/add-geotag";
const PATH_REFRESH: &str = "customer/refresh-token";

const HEADER_API_KEY: &str = "x-api-key";
const HEADER_AUTH_TOKEN: &str = "x-auth-token";

/// HTTP client for the verification backend.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("timeout_seconds", &self.config.timeout_seconds)
            .finish()
    }
}

impl ApiClient {
    /// Create a client after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for an invalid config or if the
    /// underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        api_key: &str,
        auth_token: Option<&str>,
    ) -> RequestBuilder {
        let url = self.config.endpoint(path);
        debug!(%method, path, "verification api request");
        let mut request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("accept", "*/*")
            .header(HEADER_API_KEY, api_key);
        if let Some(token) = auth_token {
            request = request.header(HEADER_AUTH_TOKEN, token);
        }
        request
    }

    /// Fetch the organisation's geotagging policy. Authenticated by API key only.
    pub async fn organization_config(&self, api_key: &str) -> Result<OrganisationConfig> {
        let response = send(self.request(Method::GET, PATH_ORG_CONFIG, api_key, None)).await?;
        let envelope: Envelope<OrganisationConfig> = read_envelope(response).await?;
        envelope
            .data
            .ok_or_else(|| ApiError::Decode("organization config response has no data".into()))
    }

    /// Fetch the customer's verification records.
    pub async fn customer_history(
        &self,
        api_key: &str,
        auth_token: &str,
    ) -> Result<Vec<CustomerRecord>> {
        let response =
            send(self.request(Method::GET, PATH_HISTORY, api_key, Some(auth_token))).await?;
        let envelope: Envelope<Vec<CustomerRecord>> = read_envelope(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Submit one geotag.
    pub async fn add_geotag(
        &self,
        api_key: &str,
        auth_token: &str,
        body: &AddGeoTagRequest,
    ) -> Result<()> {
        let request = self
            .request(Method::POST, PATH_ADD_GEOTAG, api_key, Some(auth_token))
            .json(body);
        let response = send(request).await?;
        let _: Envelope<serde_json::Value> = read_envelope(response).await?;
        Ok(())
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh_token(&self, api_key: &str, refresh_token: &str) -> Result<TokenPair> {
        let request = self
            .request(Method::POST, PATH_REFRESH, api_key, None)
            .json(&RefreshTokenRequest { refresh_token });
        let response = send(request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read refresh response: {e}")))?;
        check_status(status, &body)?;
        let parsed: RefreshTokenBody = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("invalid refresh response: {e}")))?;
        Ok(parsed.into_pair())
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            ApiError::Network(format!("request timed out: {e}"))
        } else {
            ApiError::Network(format!("request failed: {e}"))
        }
    })
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))?;
    check_status(status, &body)?;

    let envelope: Envelope<T> = serde_json::from_str(&body)
        .map_err(|e| ApiError::Decode(format!("unexpected response shape: {e}")))?;

    if !envelope.status {
        let code = envelope.status_code.unwrap_or(status.as_u16());
        if code == StatusCode::UNAUTHORIZED.as_u16() {
            return Err(ApiError::Unauthorized(envelope.message));
        }
        return Err(ApiError::Http {
            status: code,
            message: envelope.message,
        });
    }
    Ok(envelope)
}

/// Map a non-success transport status onto an [`ApiError`].
fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = extract_message(body);
    debug!(status = status.as_u16(), "verification api error response");
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(message));
    }
    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Pull `message` out of an error body, falling back to the raw text.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_owned())
}

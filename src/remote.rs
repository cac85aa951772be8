//! Token-refreshing client for the verification backend.
//!
//! [`RemoteClient`] reads key material from a [`CredentialStore`] on every
//! call. When the backend rejects the auth token it exchanges the stored
//! refresh token, writes the new pair back, and retries the call exactly
//! once. Refreshes are serialized: a caller that was rejected with a token
//! someone else already rotated reuses the new token instead of spending
//! the refresh token a second time, and a caller whose request overlapped a
//! refresh that failed gets that failure instead of repeating it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use geoverify_api::{ApiClient, ApiError, CustomerRecord};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Credentials};
use crate::error::{AgentError, Result};
use crate::types::{GeoTagEvent, OrgPolicy, VerificationRecord, VerificationStatus};

/// Operations the orchestrator needs from the verification service.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    /// Current org geotagging policy.
    async fn fetch_policy(&self) -> Result<OrgPolicy>;

    /// The customer's pending verification record, if there is one.
    async fn fetch_pending_record(&self) -> Result<Option<VerificationRecord>>;

    /// Deliver one geotag.
    async fn submit_geotag(&self, event: &GeoTagEvent) -> Result<()>;
}

/// [`VerificationBackend`] over HTTP with automatic token refresh.
pub struct RemoteClient {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    /// Held for the whole refresh; holds the reason the last attempt failed.
    refresh_gate: tokio::sync::Mutex<Option<String>>,
    /// Bumped each time a refresh attempt finishes, either way.
    refresh_attempts: AtomicU64,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            api,
            store,
            refresh_gate: tokio::sync::Mutex::new(None),
            refresh_attempts: AtomicU64::new(0),
        }
    }

    fn credentials(&self) -> Result<Credentials> {
        self.store.load()?.ok_or(AgentError::CredentialsMissing)
    }

    /// Run `call` with the stored credentials, refreshing and retrying once
    /// if the auth token is rejected.
    async fn with_auth<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Fn(Credentials) -> Fut,
        Fut: Future<Output = geoverify_api::Result<T>>,
    {
        let attempts_seen = self.refresh_attempts.load(Ordering::Acquire);
        let credentials = self.credentials()?;
        let rejected_token = credentials.auth_token.clone();

        let message = match call(credentials).await {
            Err(ApiError::Unauthorized(message)) => message,
            other => return other.map_err(AgentError::from),
        };

        warn!(operation, "auth token rejected, refreshing");
        let refreshed = self
            .refresh_after(attempts_seen, &rejected_token, &message)
            .await?;
        call(refreshed).await.map_err(|e| {
            if e.is_unauthorized() {
                warn!(operation, "auth token rejected again after refresh");
            }
            AgentError::from(e)
        })
    }

    /// Obtain a token newer than `rejected_token`, refreshing at most once
    /// across all concurrent callers.
    ///
    /// `attempts_seen` is the attempt counter read before the rejected call
    /// was sent. If an attempt finished since then and failed, the stored
    /// refresh token was already turned down, so that failure is returned
    /// without another exchange.
    async fn refresh_after(
        &self,
        attempts_seen: u64,
        rejected_token: &str,
        original: &str,
    ) -> Result<Credentials> {
        let mut last_failure = self.refresh_gate.lock().await;

        let current = self.credentials()?;
        if current.auth_token != rejected_token {
            debug!("token already rotated by a concurrent refresh");
            return Ok(current);
        }
        if self.refresh_attempts.load(Ordering::Acquire) != attempts_seen {
            if let Some(reason) = last_failure.as_ref() {
                debug!("concurrent refresh already failed, not retrying");
                return Err(AgentError::AuthRefreshFailed {
                    original: original.to_owned(),
                    reason: reason.clone(),
                });
            }
        }

        let exchanged = self
            .api
            .refresh_token(&current.api_key, &current.refresh_token)
            .await;
        self.refresh_attempts.fetch_add(1, Ordering::AcqRel);

        let pair = match exchanged {
            Ok(pair) => {
                *last_failure = None;
                pair
            }
            Err(e) => {
                warn!("token refresh failed: {e}");
                let reason = e.to_string();
                *last_failure = Some(reason.clone());
                return Err(AgentError::AuthRefreshFailed {
                    original: original.to_owned(),
                    reason,
                });
            }
        };

        let updated = self.store.update_tokens(&pair.token, &pair.refresh_token)?;
        info!("auth token refreshed");
        Ok(updated)
    }
}

#[async_trait]
impl VerificationBackend for RemoteClient {
    async fn fetch_policy(&self) -> Result<OrgPolicy> {
        let credentials = self.credentials()?;
        let config = self.api.organization_config(&credentials.api_key).await?;
        Ok(OrgPolicy::from(&config))
    }

    async fn fetch_pending_record(&self) -> Result<Option<VerificationRecord>> {
        let records = self
            .with_auth("address-history", |creds| async move {
                self.api
                    .customer_history(&creds.api_key, &creds.auth_token)
                    .await
            })
            .await?;
        Ok(select_pending(records))
    }

    async fn submit_geotag(&self, event: &GeoTagEvent) -> Result<()> {
        let body = event.to_request();
        let body = &body;
        self.with_auth("add-geotag", |creds| async move {
            self.api
                .add_geotag(&creds.api_key, &creds.auth_token, body)
                .await
        })
        .await
    }
}

/// First record whose status is pending.
fn select_pending(records: Vec<CustomerRecord>) -> Option<VerificationRecord> {
    records
        .into_iter()
        .find(|r| VerificationStatus::parse(&r.verification_status) == VerificationStatus::Pending)
        .map(VerificationRecord::from)
}

//! Collaborators the orchestrator consumes but does not implement.
//!
//! The host application supplies location and geocoding; this crate ships
//! a wall clock, a TCP reachability probe, and a wake scheduler that only
//! logs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::Coordinates;

/// Location authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Undetermined,
    Granted,
    Denied,
}

/// Source of device location fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn permission_status(&self) -> PermissionStatus;

    /// Prompt the user. The answer arrives later on the permission channel
    /// passed to [`Orchestrator::watch_permissions`](crate::orchestrator::Orchestrator::watch_permissions).
    async fn request_permission(&self);

    async fn start_updates(&self);

    async fn stop_updates(&self);

    /// Current fix, or `None` if the platform has none to give.
    async fn current_location(&self) -> Option<Coordinates>;
}

/// Reverse geocoding.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Human-readable address for `coordinates`.
    ///
    /// Implementations report failure as [`AgentError::GeocodeFailed`](crate::AgentError::GeocodeFailed).
    async fn reverse_geocode(&self, coordinates: Coordinates) -> crate::error::Result<String>;
}

/// Best-effort reachability check.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Time source. Injected so sessions can be driven on virtual time.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Wait until `deadline`. Returns immediately if it has passed.
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// Asks the platform to relaunch the agent later.
pub trait WakeScheduler: Send + Sync {
    fn request_wake(&self, at: DateTime<Utc>);
}

/// Wall clock backed by `chrono::Utc` and `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        if let Ok(wait) = (deadline - Utc::now()).to_std() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Treats a completed TCP handshake with `host:port` as "online".
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_online(&self) -> bool {
        let connect = tokio::net::TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(host = %self.host, "connectivity probe failed: {e}");
                false
            }
            Err(_) => {
                tracing::debug!(host = %self.host, "connectivity probe timed out");
                false
            }
        }
    }
}

/// Logs wake requests; for hosts without a background scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWakeScheduler;

impl WakeScheduler for NoopWakeScheduler {
    fn request_wake(&self, at: DateTime<Utc>) {
        tracing::info!(due = %at, "wake requested but no background scheduler is installed");
    }
}

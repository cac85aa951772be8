//! Shared fakes for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use geoverify::credentials::{
    CredentialError, CredentialStore, Credentials, MemoryCredentialStore,
};
use geoverify::providers::{
    Clock, ConnectivityProbe, Geocoder, LocationProvider, PermissionStatus, WakeScheduler,
};
use geoverify::remote::RemoteClient;
use geoverify::types::Coordinates;
use geoverify_api::{ApiClient, ApiConfig};
use wiremock::MockServer;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 28, 8, 0, 0).unwrap()
}

pub fn api_for(server: &MockServer) -> ApiClient {
    let config = ApiConfig::default().with_base_url(format!("{}/v1/api", server.uri()));
    ApiClient::new(config).expect("client")
}

pub fn remote_for(server: &MockServer, store: Arc<dyn CredentialStore>) -> RemoteClient {
    RemoteClient::new(api_for(server), store)
}

/// Memory store that counts token rotations.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    updates: AtomicUsize,
}

impl CountingStore {
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: MemoryCredentialStore::with_credentials(credentials),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl CredentialStore for CountingStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        self.inner.load()
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        self.inner.save(credentials)
    }

    fn update_tokens(
        &self,
        auth_token: &str,
        refresh_token: &str,
    ) -> Result<Credentials, CredentialError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_tokens(auth_token, refresh_token)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.inner.clear()
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap();
        if deadline > *now {
            *now = deadline;
        }
    }
}

/// Location provider with permission granted and a fixed fix.
pub struct FixedLocation;

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn permission_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_permission(&self) {}

    async fn start_updates(&self) {}

    async fn stop_updates(&self) {}

    async fn current_location(&self) -> Option<Coordinates> {
        Some(Coordinates::new(6.45, 3.39))
    }
}

pub struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn reverse_geocode(&self, _coordinates: Coordinates) -> geoverify::Result<String> {
        Ok("12 Marina Road, Lagos".into())
    }
}

pub struct SwitchProbe {
    online: AtomicBool,
}

impl SwitchProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for SwitchProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingWake {
    pub wakes: Mutex<Vec<DateTime<Utc>>>,
}

impl WakeScheduler for RecordingWake {
    fn request_wake(&self, at: DateTime<Utc>) {
        self.wakes.lock().unwrap().push(at);
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

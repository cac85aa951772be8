//! In-memory collaborators for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::background::BackgroundTask;
use crate::cache::{EventCache, MemoryEventCache};
use crate::credentials::{Credentials, MemoryCredentialStore};
use crate::error::{AgentError, Result};
use crate::orchestrator::{Collaborators, Orchestrator, TrackingConfig};
use crate::providers::{
    Clock, ConnectivityProbe, Geocoder, LocationProvider, PermissionStatus, WakeScheduler,
};
use crate::remote::VerificationBackend;
use crate::types::{
    CachedGeoTag, Coordinates, GeoSample, GeoTagEvent, OrgPolicy, VerificationRecord,
    VerificationStatus,
};

type ErrorFactory = Box<dyn Fn() -> AgentError + Send + Sync>;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 28, 8, 0, 0).unwrap()
}

/// Distinct event captured `offset` hours after [`t0`].
pub(crate) fn event_at(offset: i64) -> GeoTagEvent {
    GeoTagEvent::new(
        format!("{offset} Marina Road, Lagos"),
        Coordinates::new(6.45, 3.39),
        t0() + TimeDelta::hours(offset),
    )
}

/// Pending record whose latest sample is at `latest`.
pub(crate) fn pending_record(latest: Option<DateTime<Utc>>) -> VerificationRecord {
    VerificationRecord {
        id: "rec-1".into(),
        status: VerificationStatus::Pending,
        samples: latest
            .into_iter()
            .map(|timestamp| GeoSample {
                address: "1 Marina Road, Lagos".into(),
                coordinates: Coordinates::new(6.45, 3.39),
                timestamp,
            })
            .collect(),
    }
}

/// Clock whose `sleep_until` jumps straight to the deadline.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new(start: DateTime<Utc>) -> Self {
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
        {
            let mut now = self.now.lock().unwrap();
            if deadline > *now {
                *now = deadline;
            }
        }
        tokio::task::yield_now().await;
    }
}

pub(crate) struct FakeBackend {
    policy: Mutex<OrgPolicy>,
    record: Mutex<Option<VerificationRecord>>,
    policy_error: Mutex<Option<ErrorFactory>>,
    history_error: Mutex<Option<ErrorFactory>>,
    policy_gate: Mutex<Option<Arc<Notify>>>,
    policy_calls: AtomicUsize,
    submit_attempts: AtomicUsize,
    submitted: Mutex<Vec<GeoTagEvent>>,
    submit_failing: AtomicBool,
    fail_attempts: Mutex<Vec<usize>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            policy: Mutex::new(OrgPolicy::new(1.0, 1)),
            record: Mutex::new(None),
            policy_error: Mutex::new(None),
            history_error: Mutex::new(None),
            policy_gate: Mutex::new(None),
            policy_calls: AtomicUsize::new(0),
            submit_attempts: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            submit_failing: AtomicBool::new(false),
            fail_attempts: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }
}

impl FakeBackend {
    pub(crate) fn set_policy(&self, policy: OrgPolicy) {
        *self.policy.lock().unwrap() = policy;
    }

    pub(crate) fn set_record(&self, record: Option<VerificationRecord>) {
        *self.record.lock().unwrap() = record;
    }

    pub(crate) fn fail_policy_with(&self, error: impl Fn() -> AgentError + Send + Sync + 'static) {
        *self.policy_error.lock().unwrap() = Some(Box::new(error));
    }

    pub(crate) fn fail_history_with(&self, error: impl Fn() -> AgentError + Send + Sync + 'static) {
        *self.history_error.lock().unwrap() = Some(Box::new(error));
    }

    /// Make `fetch_policy` wait for `gate` after counting the call.
    pub(crate) fn gate_policy(&self, gate: Arc<Notify>) {
        *self.policy_gate.lock().unwrap() = Some(gate);
    }

    pub(crate) fn set_submit_failing(&self, failing: bool) {
        self.submit_failing.store(failing, Ordering::SeqCst);
    }

    /// Fail the submissions with these zero-based attempt numbers.
    pub(crate) fn fail_submissions_at(&self, attempts: &[usize]) {
        *self.fail_attempts.lock().unwrap() = attempts.to_vec();
    }

    /// Cancel `token` once `count` submissions have succeeded.
    pub(crate) fn cancel_after_deliveries(&self, count: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((count, token));
    }

    pub(crate) fn policy_calls(&self) -> usize {
        self.policy_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_attempts(&self) -> usize {
        self.submit_attempts.load(Ordering::SeqCst)
    }

    /// Successfully submitted events, in delivery order.
    pub(crate) fn submitted(&self) -> Vec<GeoTagEvent> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationBackend for FakeBackend {
    async fn fetch_policy(&self) -> Result<OrgPolicy> {
        self.policy_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.policy_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(error) = self.policy_error.lock().unwrap().as_ref() {
            return Err(error());
        }
        Ok(*self.policy.lock().unwrap())
    }

    async fn fetch_pending_record(&self) -> Result<Option<VerificationRecord>> {
        if let Some(error) = self.history_error.lock().unwrap().as_ref() {
            return Err(error());
        }
        Ok(self.record.lock().unwrap().clone())
    }

    async fn submit_geotag(&self, event: &GeoTagEvent) -> Result<()> {
        let attempt = self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.submit_failing.load(Ordering::SeqCst)
            || self.fail_attempts.lock().unwrap().contains(&attempt)
        {
            return Err(AgentError::Network("connection reset".into()));
        }
        let delivered = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(event.clone());
            submitted.len()
        };
        if let Some((count, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if delivered >= *count {
                token.cancel();
            }
        }
        Ok(())
    }
}

pub(crate) struct FakeLocation {
    permission: Mutex<PermissionStatus>,
    fix: Mutex<Option<Coordinates>>,
    permission_requests: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl Default for FakeLocation {
    fn default() -> Self {
        Self {
            permission: Mutex::new(PermissionStatus::Granted),
            fix: Mutex::new(Some(Coordinates::new(6.45, 3.39))),
            permission_requests: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }
}

impl FakeLocation {
    pub(crate) fn set_permission(&self, status: PermissionStatus) {
        *self.permission.lock().unwrap() = status;
    }

    pub(crate) fn set_fix(&self, fix: Option<Coordinates>) {
        *self.fix.lock().unwrap() = fix;
    }

    pub(crate) fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn permission_status(&self) -> PermissionStatus {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
    }

    async fn start_updates(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    async fn stop_updates(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn current_location(&self) -> Option<Coordinates> {
        *self.fix.lock().unwrap()
    }
}

#[derive(Default)]
pub(crate) struct FakeGeocoder {
    failing: AtomicBool,
}

impl FakeGeocoder {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn reverse_geocode(&self, _coordinates: Coordinates) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AgentError::GeocodeFailed("no placemark".into()));
        }
        Ok("12 Marina Road, Lagos".into())
    }
}

pub(crate) struct FakeProbe {
    online: AtomicBool,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }
}

impl FakeProbe {
    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for FakeProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct RecordingWake {
    wakes: Mutex<Vec<DateTime<Utc>>>,
}

impl RecordingWake {
    pub(crate) fn wakes(&self) -> Vec<DateTime<Utc>> {
        self.wakes.lock().unwrap().clone()
    }
}

impl WakeScheduler for RecordingWake {
    fn request_wake(&self, at: DateTime<Utc>) {
        self.wakes.lock().unwrap().push(at);
    }
}

/// Cache whose writes always fail.
#[derive(Default)]
pub(crate) struct BrokenCache;

#[async_trait]
impl EventCache for BrokenCache {
    async fn load(&self) -> Result<Vec<CachedGeoTag>> {
        Ok(Vec::new())
    }

    async fn append(&self, _event: CachedGeoTag) -> Result<()> {
        Err(AgentError::Cache("disk full".into()))
    }

    async fn remove_front(&self, _count: usize) -> Result<()> {
        Err(AgentError::Cache("disk full".into()))
    }

    async fn clear(&self) -> Result<()> {
        Err(AgentError::Cache("disk full".into()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Background unit of work that records what it was told.
pub(crate) struct RecordingTask {
    expiration: CancellationToken,
    reports: Arc<Mutex<Vec<bool>>>,
}

impl RecordingTask {
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<bool>>>) {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let task = Self {
            expiration: CancellationToken::new(),
            reports: Arc::clone(&reports),
        };
        (task, reports)
    }
}

impl BackgroundTask for RecordingTask {
    fn expiration(&self) -> CancellationToken {
        self.expiration.clone()
    }

    fn complete(self: Box<Self>, success: bool) {
        self.reports.lock().unwrap().push(success);
    }
}

/// Fully faked collaborator set with credentials stored and permission granted.
pub(crate) struct Harness {
    pub(crate) credentials: Arc<MemoryCredentialStore>,
    pub(crate) cache: Arc<MemoryEventCache>,
    pub(crate) backend: Arc<FakeBackend>,
    pub(crate) location: Arc<FakeLocation>,
    pub(crate) geocoder: Arc<FakeGeocoder>,
    pub(crate) probe: Arc<FakeProbe>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) wake: Arc<RecordingWake>,
    pub(crate) config: TrackingConfig,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            credentials: Arc::new(MemoryCredentialStore::with_credentials(credentials())),
            cache: Arc::new(MemoryEventCache::new()),
            backend: Arc::new(FakeBackend::default()),
            location: Arc::new(FakeLocation::default()),
            geocoder: Arc::new(FakeGeocoder::default()),
            probe: Arc::new(FakeProbe::default()),
            clock: Arc::new(ManualClock::new(t0())),
            wake: Arc::new(RecordingWake::default()),
            config: TrackingConfig::default(),
        }
    }

    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            credentials: self.credentials.clone(),
            cache: self.cache.clone(),
            backend: self.backend.clone(),
            location: self.location.clone(),
            geocoder: self.geocoder.clone(),
            connectivity: self.probe.clone(),
            clock: self.clock.clone(),
            wake: self.wake.clone(),
        }
    }

    pub(crate) fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(self.collaborators(), self.config))
    }
}

pub(crate) fn credentials() -> Credentials {
    Credentials::new("key", "auth", "refresh", "cust-1")
}

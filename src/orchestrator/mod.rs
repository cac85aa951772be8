//! Tracking session state machine.
//!
//! An [`Orchestrator`] owns at most one running session. A session fetches
//! the org policy and the pending verification record, plans capture
//! instants from the record's latest sample, then sleeps until each
//! instant and runs one capture-and-deliver tick. It ends when the
//! schedule runs out, when the per-invocation tick budget is spent, or
//! when it is cancelled. Unfinished instants are not stored; the next
//! invocation replans them from the backend's history, and the
//! orchestrator asks the [`WakeScheduler`] to come back at the first one.
//!
//! Cancellation is observed only while waiting for the next instant or at
//! the top of an iteration, so a tick that has started always finishes its
//! deliver-or-cache step.

mod guard;
mod state;
mod tick;


pub use state::TrackingState;
pub use tick::{CacheReason, SkipReason, TickOutcome};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::EventCache;
use crate::config::TrackingSettings;
use crate::credentials::{CredentialStore, Credentials};
use crate::error::{AgentError, Result};
use crate::planner;
use crate::providers::{
    Clock, ConnectivityProbe, Geocoder, LocationProvider, PermissionStatus, WakeScheduler,
};
use crate::remote::VerificationBackend;
use guard::{SessionGuard, SessionLease};

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialStore>,
    pub cache: Arc<dyn EventCache>,
    pub backend: Arc<dyn VerificationBackend>,
    pub location: Arc<dyn LocationProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub connectivity: Arc<dyn ConnectivityProbe>,
    pub clock: Arc<dyn Clock>,
    pub wake: Arc<dyn WakeScheduler>,
}

/// Per-invocation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Ticks one `start`/resume may run before yielding. At least 1.
    pub max_ticks_per_invocation: u32,
    /// Bound on the connectivity probe.
    pub connectivity_timeout: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self::from(&TrackingSettings::default())
    }
}

impl From<&TrackingSettings> for TrackingConfig {
    fn from(settings: &TrackingSettings) -> Self {
        Self {
            max_ticks_per_invocation: settings.max_ticks_per_invocation,
            connectivity_timeout: settings.connectivity_timeout(),
        }
    }
}

/// Result of `start` or `resume`.
#[derive(Debug)]
pub enum StartOutcome {
    /// Permission was undetermined; the prompt is showing and nothing was
    /// scheduled.
    PermissionRequested,
    /// Permission is undetermined and this was a resumption, which never
    /// prompts; nothing was scheduled.
    PermissionUndetermined,
    /// Permission is denied.
    PermissionDenied,
    /// Another session holds the guard; this call did nothing.
    AlreadyActive,
    /// A session ran on this call.
    Session(SessionReport),
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// Every planned instant was serviced, or none were left.
    ScheduleExhausted,
    /// The per-invocation tick budget was spent.
    TickBudgetReached,
    /// The customer has no pending verification.
    NoPendingVerification,
    /// The org policy could not be fetched.
    PolicyUnavailable(String),
    /// The verification history could not be fetched.
    HistoryUnavailable(String),
    /// The external expiration signal fired.
    Cancelled,
    /// `stop` was called.
    Stopped,
}

/// Summary of one session run.
#[derive(Debug)]
pub struct SessionReport {
    pub id: Uuid,
    pub end: SessionEnd,
    pub ticks: Vec<TickOutcome>,
    /// First planned instant not yet serviced.
    pub next_due: Option<DateTime<Utc>>,
}

impl SessionReport {
    fn ended(id: Uuid, end: SessionEnd) -> Self {
        Self {
            id,
            end,
            ticks: Vec::new(),
            next_due: None,
        }
    }
}

/// Drives tracking sessions for one customer.
pub struct Orchestrator {
    deps: Collaborators,
    config: TrackingConfig,
    guard: Arc<SessionGuard>,
    state: watch::Sender<TrackingState>,
}

impl Orchestrator {
    pub fn new(deps: Collaborators, config: TrackingConfig) -> Self {
        let config = TrackingConfig {
            max_ticks_per_invocation: config.max_ticks_per_invocation.max(1),
            ..config
        };
        let (state, _) = watch::channel(TrackingState::Idle);
        Self {
            deps,
            config,
            guard: Arc::new(SessionGuard::default()),
            state,
        }
    }

    pub fn state(&self) -> TrackingState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<TrackingState> {
        self.state.subscribe()
    }

    /// A session currently holds the single-flight guard.
    pub fn is_session_active(&self) -> bool {
        self.guard.is_held()
    }

    /// Credentials a resumption would run with.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stored_credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.deps.credentials.load()?)
    }

    fn set_state(&self, state: TrackingState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "tracking state changed");
        }
    }

    /// Enter a session phase unless the session was cancelled.
    ///
    /// Checked under the state channel's lock so it cannot interleave with
    /// [`stop`](Self::stop) and overwrite `Idle`.
    fn set_phase(&self, lease: &SessionLease, phase: TrackingState) {
        self.state.send_if_modified(|state| {
            if lease.token().is_cancelled() || *state == phase {
                return false;
            }
            *state = phase;
            true
        });
    }

    /// Enter a post-session state unless `stop` released this lease, in
    /// which case `stop` already owns the state.
    fn settle(&self, lease: &SessionLease, settled: TrackingState) {
        self.state.send_if_modified(|state| {
            if lease.stopped() || *state == settled {
                return false;
            }
            debug!(from = %state, to = %settled, "tracking state changed");
            *state = settled;
            true
        });
    }

    /// Persist `credentials` and run a session with them.
    ///
    /// Credentials are saved before the permission and single-flight checks,
    /// so a later background resumption finds them even if this call ends
    /// up doing nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::CredentialsMissing`] for an incomplete record,
    /// a store error if saving fails, and any failure that must reach the
    /// caller (see [`AgentError::must_propagate`]).
    pub async fn start(&self, credentials: Credentials) -> Result<StartOutcome> {
        if !credentials.is_complete() {
            return Err(AgentError::CredentialsMissing);
        }
        self.deps.credentials.save(&credentials)?;
        info!(customer_id = %credentials.customer_id, "tracking start requested");
        self.begin(CancellationToken::new(), Prompt::Allowed).await
    }

    /// Run a session with the stored credentials, stopping when
    /// `expiration` fires.
    ///
    /// Never shows the permission prompt: an undetermined permission yields
    /// [`StartOutcome::PermissionUndetermined`] and leaves the prompt to a
    /// foreground [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start), minus the save.
    pub async fn resume(&self, expiration: CancellationToken) -> Result<StartOutcome> {
        if self.deps.credentials.load()?.is_none() {
            return Err(AgentError::CredentialsMissing);
        }
        self.begin(expiration, Prompt::Forbidden).await
    }

    /// Stop the running session, if any, and go idle.
    ///
    /// The session notices at its next suspension point; a tick in progress
    /// completes first.
    pub async fn stop(&self) {
        let mut released = false;
        self.state.send_modify(|state| {
            released = self.guard.force_release();
            *state = TrackingState::Idle;
        });
        if released {
            info!("tracking session stopped");
        }
        self.deps.location.stop_updates().await;
    }

    /// Consume permission changes from the platform.
    ///
    /// `Granted` while a prompt is pending starts a session with the stored
    /// credentials; `Denied` stops any session and moves to `Denied`.
    pub fn watch_permissions(
        self: Arc<Self>,
        mut changes: mpsc::Receiver<PermissionStatus>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(status) = changes.recv().await {
                debug!(?status, "location permission changed");
                match status {
                    PermissionStatus::Granted if self.state() == TrackingState::PermissionPending => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            match this.resume(CancellationToken::new()).await {
                                Ok(outcome) => debug!(?outcome, "session after permission grant"),
                                Err(e) => warn!("session after permission grant failed: {e}"),
                            }
                        });
                    }
                    PermissionStatus::Denied => {
                        self.stop().await;
                        self.set_state(TrackingState::Denied);
                    }
                    PermissionStatus::Granted | PermissionStatus::Undetermined => {}
                }
            }
        })
    }

    async fn begin(&self, expiration: CancellationToken, prompt: Prompt) -> Result<StartOutcome> {
        match self.deps.location.permission_status().await {
            PermissionStatus::Granted => {}
            PermissionStatus::Undetermined if prompt == Prompt::Forbidden => {
                info!("location permission undetermined, not prompting from resumption");
                return Ok(StartOutcome::PermissionUndetermined);
            }
            PermissionStatus::Undetermined => {
                self.set_state(TrackingState::PermissionPending);
                self.deps.location.request_permission().await;
                info!("location permission requested");
                return Ok(StartOutcome::PermissionRequested);
            }
            PermissionStatus::Denied => {
                self.set_state(TrackingState::Denied);
                warn!("location permission denied");
                return Ok(StartOutcome::PermissionDenied);
            }
        }

        let Some(lease) = self.guard.try_acquire(&expiration) else {
            info!("tracking session already active, ignoring");
            return Ok(StartOutcome::AlreadyActive);
        };
        self.set_state(TrackingState::Active);
        self.deps.location.start_updates().await;

        let result = self.run_session(&lease).await;

        // After `stop`, updates are already halted and the guard may belong
        // to a newer session.
        let stopped = lease.stopped();
        match &result {
            Ok(report) => {
                if !stopped {
                    self.deps.location.stop_updates().await;
                    if let Some(due) = report.next_due {
                        self.deps.wake.request_wake(due);
                    }
                }
                match report.end {
                    SessionEnd::Stopped => {}
                    SessionEnd::Cancelled => self.settle(&lease, TrackingState::Suspended),
                    _ => {
                        self.settle(&lease, TrackingState::SessionComplete);
                        self.settle(&lease, TrackingState::Idle);
                    }
                }
                info!(
                    session_id = %report.id,
                    end = ?report.end,
                    ticks = report.ticks.len(),
                    next_due = ?report.next_due,
                    "tracking session ended"
                );
            }
            Err(e) => {
                if !stopped {
                    self.deps.location.stop_updates().await;
                    self.settle(&lease, TrackingState::Idle);
                }
                warn!(session_id = %lease.id(), "tracking session failed: {e}");
            }
        }
        drop(lease);
        result.map(StartOutcome::Session)
    }

    async fn run_session(&self, lease: &SessionLease) -> Result<SessionReport> {
        let id = lease.id();

        let policy = match self.deps.backend.fetch_policy().await {
            Ok(policy) => policy,
            Err(e) if e.must_propagate() => return Err(e),
            Err(e) => {
                warn!(session_id = %id, "org policy unavailable: {e}");
                return Ok(SessionReport::ended(
                    id,
                    SessionEnd::PolicyUnavailable(e.to_string()),
                ));
            }
        };

        let record = match self.deps.backend.fetch_pending_record().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(session_id = %id, "no pending verification");
                return Ok(SessionReport::ended(id, SessionEnd::NoPendingVerification));
            }
            Err(e) if e.must_propagate() => return Err(e),
            Err(e) => {
                warn!(session_id = %id, "verification history unavailable: {e}");
                return Ok(SessionReport::ended(
                    id,
                    SessionEnd::HistoryUnavailable(e.to_string()),
                ));
            }
        };

        let now = self.deps.clock.now();
        let anchor = record.latest_sample_at().unwrap_or(now);
        let mut schedule = planner::plan(anchor, &policy, now);
        info!(
            session_id = %id,
            record_id = %record.id,
            %anchor,
            captures = schedule.len(),
            "capture schedule armed"
        );

        let budget = self.config.max_ticks_per_invocation as usize;
        let cancel = lease.token();
        let mut ticks = Vec::new();

        let end = loop {
            if cancel.is_cancelled() {
                break cancel_reason(lease);
            }
            let Some(due) = schedule.peek() else {
                break SessionEnd::ScheduleExhausted;
            };
            if ticks.len() >= budget {
                break SessionEnd::TickBudgetReached;
            }

            debug!(session_id = %id, %due, "waiting for next capture");
            tokio::select! {
                biased;
                () = cancel.cancelled() => break cancel_reason(lease),
                () = self.deps.clock.sleep_until(due) => {}
            }

            schedule.next();
            let outcome = self.capture_and_deliver(lease).await;
            debug!(session_id = %id, ?outcome, "tick finished");
            ticks.push(outcome);
            self.set_phase(lease, TrackingState::Active);
        };

        Ok(SessionReport {
            id,
            end,
            ticks,
            next_due: schedule.peek(),
        })
    }
}

/// Whether `begin` may show the permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Allowed,
    Forbidden,
}

fn cancel_reason(lease: &SessionLease) -> SessionEnd {
    if lease.expired() && !lease.stopped() {
        SessionEnd::Cancelled
    } else {
        SessionEnd::Stopped
    }
}

//! Entry point for platform-scheduled background work.
//!
//! When the platform relaunches the agent to service a wake it requested
//! earlier, the host hands the unit of work to
//! [`ResumptionAdapter::handle`]. The adapter rebuilds the session from the
//! credential store alone, runs it under the unit's expiration signal, and
//! reports completion exactly once, including when the handler future is
//! dropped or unwinds part-way.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::orchestrator::{Orchestrator, SessionEnd, StartOutcome};

/// A unit of background work granted by the platform.
pub trait BackgroundTask: Send {
    /// Fires when the platform's execution window is about to close.
    fn expiration(&self) -> CancellationToken;

    /// Acknowledge the unit of work. Consumes the task, so it can only
    /// happen once.
    fn complete(self: Box<Self>, success: bool);
}

/// Reports `false` on drop unless a result was reported first.
struct Completion {
    task: Option<Box<dyn BackgroundTask>>,
}

impl Completion {
    fn new(task: Box<dyn BackgroundTask>) -> Self {
        Self { task: Some(task) }
    }

    fn report(mut self, success: bool) {
        if let Some(task) = self.task.take() {
            task.complete(success);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("background task abandoned, reporting failure");
            task.complete(false);
        }
    }
}

/// Re-enters the orchestrator for platform-scheduled work.
pub struct ResumptionAdapter {
    orchestrator: Arc<Orchestrator>,
}

impl ResumptionAdapter {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Service one background unit of work.
    ///
    /// Returns the success flag that was reported to the platform.
    ///
    /// # Errors
    ///
    /// Returns store read failures and any session failure that must reach
    /// the caller. The task has already been completed with `false` when
    /// this returns an error.
    pub async fn handle(&self, task: Box<dyn BackgroundTask>) -> Result<bool> {
        let expiration = task.expiration();
        let completion = Completion::new(task);

        match self.orchestrator.stored_credentials() {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("background wake without stored credentials");
                completion.report(false);
                return Ok(false);
            }
            Err(e) => {
                completion.report(false);
                return Err(e);
            }
        }

        match self.orchestrator.resume(expiration).await {
            Ok(outcome) => {
                let success = succeeded(&outcome);
                info!(success, "background work finished");
                completion.report(success);
                Ok(success)
            }
            Err(e) => {
                warn!("background session failed: {e}");
                completion.report(false);
                Err(e)
            }
        }
    }
}

fn succeeded(outcome: &StartOutcome) -> bool {
    match outcome {
        StartOutcome::AlreadyActive => true,
        StartOutcome::PermissionRequested
        | StartOutcome::PermissionUndetermined
        | StartOutcome::PermissionDenied => false,
        StartOutcome::Session(report) => !matches!(
            report.end,
            SessionEnd::Cancelled | SessionEnd::Stopped
        ),
    }
}

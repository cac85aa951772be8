//! Single-flight guard for tracking sessions.
//!
//! At most one [`SessionLease`] exists per guard. Acquisition is a
//! check-and-set under a mutex, so an explicit `start` racing a background
//! resumption cannot both win. The lease releases the slot on drop, but
//! only if the slot still holds its own session: after `stop` force-clears
//! the guard, a lingering lease from the old session must not evict a newer
//! one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug)]
struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    stopped: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
pub(crate) struct SessionGuard {
    slot: Mutex<Option<ActiveSession>>,
}

impl SessionGuard {
    fn slot(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the guard. Returns `None` if a session already holds it.
    ///
    /// The lease's token is a child of `expiration`, so cancelling the
    /// external signal also cancels the session.
    pub(crate) fn try_acquire(
        self: &Arc<Self>,
        expiration: &CancellationToken,
    ) -> Option<SessionLease> {
        let mut slot = self.slot();
        if slot.is_some() {
            return None;
        }
        let id = Uuid::new_v4();
        let cancel = expiration.child_token();
        let stopped = Arc::new(AtomicBool::new(false));
        *slot = Some(ActiveSession {
            id,
            cancel: cancel.clone(),
            stopped: Arc::clone(&stopped),
        });
        Some(SessionLease {
            guard: Arc::clone(self),
            id,
            cancel,
            expiration: expiration.clone(),
            stopped,
        })
    }

    pub(crate) fn is_held(&self) -> bool {
        self.slot().is_some()
    }

    /// Cancel and clear whatever session holds the guard, marking its
    /// lease as stopped.
    ///
    /// Returns `true` if there was one.
    pub(crate) fn force_release(&self) -> bool {
        match self.slot().take() {
            Some(active) => {
                active.stopped.store(true, Ordering::Release);
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Proof that the holder owns the running session.
#[derive(Debug)]
pub(crate) struct SessionLease {
    guard: Arc<SessionGuard>,
    id: Uuid,
    cancel: CancellationToken,
    expiration: CancellationToken,
    stopped: Arc<AtomicBool>,
}

impl SessionLease {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Fires on external expiration or on `stop`.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The external expiration signal fired.
    pub(crate) fn expired(&self) -> bool {
        self.expiration.is_cancelled()
    }

    /// `stop` released the guard out from under this lease. Takes
    /// precedence over [`expired`](Self::expired) when both happened.
    pub(crate) fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let mut slot = self.guard.slot();
        if slot.as_ref().is_some_and(|active| active.id == self.id) {
            *slot = None;
        }
    }
}

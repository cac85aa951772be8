//! One capture-and-deliver step.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::guard::SessionLease;
use super::{Orchestrator, TrackingState};
use crate::cache::flush_cache;
use crate::types::GeoTagEvent;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The event reached the backend after `flushed` cached events.
    Delivered { flushed: usize },
    /// The event was queued in the offline cache.
    Cached(CacheReason),
    /// Nothing was captured, so nothing was queued.
    Skipped(SkipReason),
    /// The event could be neither delivered nor cached.
    Lost(String),
}

/// Why an event went to the cache instead of the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheReason {
    /// The connectivity probe reported offline; no delivery attempted.
    Offline,
    /// Older cached events could not all be flushed, so this one queues
    /// behind them without a delivery attempt.
    BacklogPending,
    /// Delivery was attempted and failed.
    DeliveryFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    LocationUnavailable,
    GeocodeFailed(String),
}

impl Orchestrator {
    /// Capture the current location and deliver or cache it.
    ///
    /// Never fails: every per-tick error ends up in the returned outcome.
    pub(super) async fn capture_and_deliver(&self, lease: &SessionLease) -> TickOutcome {
        let session_id = lease.id();
        self.set_phase(lease, TrackingState::Capturing);

        let Some(coordinates) = self.deps.location.current_location().await else {
            warn!(%session_id, "no location fix, skipping tick");
            return TickOutcome::Skipped(SkipReason::LocationUnavailable);
        };

        let address = match self.deps.geocoder.reverse_geocode(coordinates).await {
            Ok(address) => address,
            Err(e) => {
                warn!(%session_id, "reverse geocoding failed, skipping tick: {e}");
                return TickOutcome::Skipped(SkipReason::GeocodeFailed(e.to_string()));
            }
        };

        let event = GeoTagEvent::new(address, coordinates, self.deps.clock.now());
        self.set_phase(lease, TrackingState::Delivering);

        let online = tokio::time::timeout(
            self.config.connectivity_timeout,
            self.deps.connectivity.is_online(),
        )
        .await
        .unwrap_or(false);
        if !online {
            debug!(%session_id, "offline, caching event");
            return self.cache_event(session_id, event, CacheReason::Offline).await;
        }

        let flushed = match flush_cache(self.deps.cache.as_ref(), self.deps.backend.as_ref()).await
        {
            Ok(report) if report.drained() => report.delivered,
            Ok(report) => {
                debug!(%session_id, remaining = report.remaining, "backlog not drained");
                return self
                    .cache_event(session_id, event, CacheReason::BacklogPending)
                    .await;
            }
            Err(e) => {
                warn!(%session_id, "cache flush failed: {e}");
                return self
                    .cache_event(session_id, event, CacheReason::BacklogPending)
                    .await;
            }
        };

        match self.deps.backend.submit_geotag(&event).await {
            Ok(()) => {
                info!(%session_id, flushed, at = %event.device_timestamp(), "geotag delivered");
                TickOutcome::Delivered { flushed }
            }
            Err(e) => {
                if e.must_propagate() {
                    error!(%session_id, "geotag delivery failed: {e}");
                } else {
                    warn!(%session_id, "geotag delivery failed: {e}");
                }
                self.cache_event(session_id, event, CacheReason::DeliveryFailed(e.to_string()))
                    .await
            }
        }
    }

    async fn cache_event(
        &self,
        session_id: Uuid,
        event: GeoTagEvent,
        reason: CacheReason,
    ) -> TickOutcome {
        match self.deps.cache.append(event).await {
            Ok(()) => {
                debug!(%session_id, ?reason, "event cached");
                TickOutcome::Cached(reason)
            }
            Err(e) => {
                error!(%session_id, "event lost, cache append failed: {e}");
                TickOutcome::Lost(e.to_string())
            }
        }
    }
}

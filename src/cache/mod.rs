//! Durable FIFO queue of geotag events that could not be delivered.
//!
//! Events are appended at the back and only ever leave from the front,
//! after the backend has accepted them. [`flush_cache`] walks the queue
//! oldest-first and stops at the first failure, so the backend always
//! sees a chronological address history.

mod file;
mod memory;

pub use file::FileEventCache;
pub use memory::MemoryEventCache;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::remote::VerificationBackend;
use crate::types::CachedGeoTag;

/// Ordered, persisted queue of undelivered events.
#[async_trait]
pub trait EventCache: Send + Sync {
    /// All queued events, oldest first.
    async fn load(&self) -> Result<Vec<CachedGeoTag>>;

    /// Append one event at the back.
    async fn append(&self, event: CachedGeoTag) -> Result<()>;

    /// Drop the `count` oldest events. Removing more than are queued empties
    /// the queue.
    async fn remove_front(&self, count: usize) -> Result<()>;

    /// Drop everything.
    async fn clear(&self) -> Result<()>;

    /// Number of queued events.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Result of one [`flush_cache`] pass.
#[derive(Debug)]
pub struct FlushReport {
    /// Events accepted by the backend and removed from the cache.
    pub delivered: usize,
    /// Events still queued after the pass.
    pub remaining: usize,
    /// The delivery error that stopped the pass, if any.
    pub failure: Option<AgentError>,
}

impl FlushReport {
    /// `true` when the cache was emptied.
    pub fn drained(&self) -> bool {
        self.remaining == 0
    }
}

/// Deliver queued events oldest-first, stopping at the first failure.
///
/// Delivered events are removed from the front only; events appended while
/// the flush runs stay queued behind the undelivered ones.
///
/// # Errors
///
/// Returns an error only when the cache itself cannot be read or updated.
/// Delivery failures are reported in [`FlushReport::failure`].
pub async fn flush_cache(
    cache: &dyn EventCache,
    backend: &dyn VerificationBackend,
) -> Result<FlushReport> {
    let queued = cache.load().await?;
    if queued.is_empty() {
        return Ok(FlushReport {
            delivered: 0,
            remaining: 0,
            failure: None,
        });
    }

    let mut delivered = 0;
    let mut failure = None;
    for event in &queued {
        match backend.submit_geotag(event).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(
                    delivered,
                    pending = queued.len() - delivered,
                    "cache flush stopped: {e}"
                );
                failure = Some(e);
                break;
            }
        }
    }

    if delivered > 0 {
        cache.remove_front(delivered).await?;
    }
    let remaining = cache.len().await?;
    tracing::info!(flushed = delivered, remaining, "cache flush finished");

    Ok(FlushReport {
        delivered,
        remaining,
        failure,
    })
}

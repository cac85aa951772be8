//! In-memory event cache.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::EventCache;
use crate::error::Result;
use crate::types::CachedGeoTag;

/// Queue held in memory; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryEventCache {
    events: Mutex<VecDeque<CachedGeoTag>>,
}

impl MemoryEventCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventCache for MemoryEventCache {
    async fn load(&self) -> Result<Vec<CachedGeoTag>> {
        Ok(self.events.lock().await.iter().cloned().collect())
    }

    async fn append(&self, event: CachedGeoTag) -> Result<()> {
        self.events.lock().await.push_back(event);
        Ok(())
    }

    async fn remove_front(&self, count: usize) -> Result<()> {
        let mut events = self.events.lock().await;
        let count = count.min(events.len());
        events.drain(..count);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.events.lock().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.events.lock().await.len())
    }
}

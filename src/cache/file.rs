//! JSON-file event cache.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::EventCache;
use crate::error::{AgentError, Result};
use crate::persist;
use crate::types::CachedGeoTag;

/// Persists the queue as a JSON array, rewritten atomically on each change.
#[derive(Debug)]
pub struct FileEventCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileEventCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<CachedGeoTag>> {
        persist::read_json(&self.path)
            .map(Option::unwrap_or_default)
            .map_err(|e| AgentError::Cache(format!("failed to read {}: {e}", self.path.display())))
    }

    fn write(&self, events: &[CachedGeoTag]) -> Result<()> {
        persist::write_json_atomic(&self.path, events).map_err(|e| {
            AgentError::Cache(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl EventCache for FileEventCache {
    async fn load(&self) -> Result<Vec<CachedGeoTag>> {
        let _guard = self.lock.lock().await;
        self.read()
    }

    async fn append(&self, event: CachedGeoTag) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut events = self.read()?;
        events.push(event);
        self.write(&events)?;
        tracing::debug!(cached = events.len(), "event cached");
        Ok(())
    }

    async fn remove_front(&self, count: usize) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut events = self.read()?;
        let count = count.min(events.len());
        events.drain(..count);
        self.write(&events)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        persist::remove_file(&self.path).map_err(|e| AgentError::Cache(e.to_string()))
    }

    async fn len(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.read()?.len())
    }
}

//! JSON-file credential backend.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CredentialError, CredentialStore, Credentials, complete_only};
use crate::persist;

/// Stores credentials as a single JSON document, replaced atomically.
///
/// A process-local mutex serializes read-modify-write in
/// [`update_tokens`](CredentialStore::update_tokens).
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let _guard = self.lock();
        Ok(complete_only(persist::read_json(&self.path)?))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let _guard = self.lock();
        persist::write_json_atomic(&self.path, credentials)?;
        tracing::debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    fn update_tokens(
        &self,
        auth_token: &str,
        refresh_token: &str,
    ) -> Result<Credentials, CredentialError> {
        let _guard = self.lock();
        let current = complete_only(persist::read_json::<Credentials>(&self.path)?)
            .ok_or(CredentialError::NotFound)?;
        let updated = current.with_tokens(auth_token, refresh_token);
        persist::write_json_atomic(&self.path, &updated)?;
        tracing::debug!("stored token pair rotated");
        Ok(updated)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let _guard = self.lock();
        persist::remove_file(&self.path)?;
        Ok(())
    }
}

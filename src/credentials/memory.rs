//! In-process credential backend.

use std::sync::Mutex;

use super::{CredentialError, CredentialStore, Credentials, complete_only};

/// Keeps credentials in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `credentials`.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            slot: Mutex::new(Some(credentials)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credentials>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(complete_only(self.slot().clone()))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        *self.slot() = Some(credentials.clone());
        Ok(())
    }

    fn update_tokens(
        &self,
        auth_token: &str,
        refresh_token: &str,
    ) -> Result<Credentials, CredentialError> {
        let mut slot = self.slot();
        let current = slot
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or(CredentialError::NotFound)?;
        let updated = current.with_tokens(auth_token, refresh_token);
        *slot = Some(updated.clone());
        Ok(updated)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.slot() = None;
        Ok(())
    }
}

//! OS keyring credential backend.
//!
//! Uses the `keyring` crate for platform secure storage:
//! - **macOS**: Keychain
//! - **Linux**: kernel keyutils (user session keyring)
//! - **Windows**: Credential Manager
//!
//! The whole record is one JSON entry, so a token rotation is a single
//! `set_password` and readers never see a half-updated pair. Every write is
//! read back through a fresh entry; a backend that accepts the write but
//! cannot return it is reported as a storage error.

use std::sync::Mutex;

use super::{CredentialError, CredentialStore, Credentials, complete_only};

/// Default keyring service name.
pub const DEFAULT_SERVICE: &str = "com.usesourceid.geoverify";

const ACCOUNT: &str = "customer-session";

/// Credential store backed by a single OS keyring entry.
#[derive(Debug)]
pub struct KeyringCredentialStore {
    service: String,
    account: String,
    write_lock: Mutex<()>,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: ACCOUNT.to_owned(),
            write_lock: Mutex::new(()),
        }
    }

    fn entry(&self) -> Result<::keyring::Entry, CredentialError> {
        ::keyring::Entry::new(&self.service, &self.account).map_err(|e| {
            CredentialError::KeyringAccess(format!("failed to create keyring entry: {e}"))
        })
    }

    fn read(&self) -> Result<Option<Credentials>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CredentialError::Corrupt(e.to_string())),
            Err(::keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::KeyringAccess(format!(
                "failed to read credentials: {e}"
            ))),
        }
    }

    fn write(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let json = serde_json::to_string(credentials)
            .map_err(|e| CredentialError::StorageError(e.to_string()))?;
        self.entry()?.set_password(&json).map_err(|e| {
            CredentialError::StorageError(format!("failed to store credentials: {e}"))
        })?;

        match self.entry()?.get_password() {
            Ok(stored) if stored == json => Ok(()),
            Ok(_) | Err(::keyring::Error::NoEntry) => Err(CredentialError::StorageError(
                "keyring accepted credentials but did not persist them".into(),
            )),
            Err(e) => Err(CredentialError::KeyringAccess(format!(
                "failed to verify stored credentials: {e}"
            ))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(complete_only(self.read()?))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let _guard = self.lock();
        self.write(credentials)
    }

    fn update_tokens(
        &self,
        auth_token: &str,
        refresh_token: &str,
    ) -> Result<Credentials, CredentialError> {
        let _guard = self.lock();
        let current = complete_only(self.read()?).ok_or(CredentialError::NotFound)?;
        let updated = current.with_tokens(auth_token, refresh_token);
        self.write(&updated)?;
        Ok(updated)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let _guard = self.lock();
        match self.entry()?.delete_credential() {
            Ok(()) | Err(::keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::StorageError(format!(
                "failed to delete credentials: {e}"
            ))),
        }
    }
}

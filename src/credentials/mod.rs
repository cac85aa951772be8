//! Durable storage for the customer's credentials.
//!
//! The record `{apiKey, authToken, refreshToken, customerID}` is the only
//! identity state that survives process death; background resumption
//! rebuilds everything else from it. Backends:
//!
//! - [`FileCredentialStore`]: JSON file with atomic replace
//! - [`KeyringCredentialStore`]: one OS keyring entry via the `keyring` crate
//! - [`MemoryCredentialStore`]: in-process, for tests and ephemeral hosts
//!
//! ```no_run
//! use geoverify::credentials::{CredentialStore, Credentials, FileCredentialStore};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileCredentialStore::new("/tmp/geoverify/credentials.json");
//! store.save(&Credentials::new("key", "auth", "refresh", "customer"))?;
//! let rotated = store.update_tokens("auth-2", "refresh-2")?;
//! assert_eq!(rotated.api_key, "key");
//! # Ok(())
//! # }
//! ```

mod file;
mod memory;
mod os_keyring;
mod types;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;
pub use os_keyring::KeyringCredentialStore;
pub use types::{CredentialError, Credentials};

/// Persists one [`Credentials`] record.
pub trait CredentialStore: Send + Sync {
    /// Load the stored record.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored record is
    /// missing any of its four fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or the record is corrupt.
    fn load(&self) -> Result<Option<Credentials>, CredentialError>;

    /// Replace the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::StorageError`] if the backend write fails.
    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError>;

    /// Replace the token pair in a single write, leaving `apiKey` and
    /// `customerID` untouched. Returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] if no complete record is stored.
    fn update_tokens(
        &self,
        auth_token: &str,
        refresh_token: &str,
    ) -> Result<Credentials, CredentialError>;

    /// Remove the stored record. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Drops records that are missing a field.
fn complete_only(credentials: Option<Credentials>) -> Option<Credentials> {
    credentials.filter(|c| {
        if !c.is_complete() {
            tracing::warn!("stored credentials are incomplete; treating as missing");
        }
        c.is_complete()
    })
}

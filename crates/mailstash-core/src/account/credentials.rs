//! Secret storage for account passwords.
//!
//! Passwords never live in the accounts file. [`KeyringSecretStore`] keeps
//! them in the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailstash";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Lookup of account secrets by account id.
pub trait SecretStore: Send + Sync {
    /// Returns the secret for `account_id`, or `None` if none is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    fn get_secret(&self, account_id: &str) -> CredentialResult<Option<String>>;

    /// Stores or replaces the secret for `account_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn set_secret(&self, account_id: &str, secret: &str) -> CredentialResult<()>;

    /// Deletes the secret for `account_id`. A missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the delete.
    fn delete_secret(&self, account_id: &str) -> CredentialResult<()>;
}

/// [`SecretStore`] backed by the system keyring.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    /// Creates a keyring-backed store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SecretStore for KeyringSecretStore {
    fn get_secret(&self, account_id: &str) -> CredentialResult<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, account_id)?;
        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => {
                debug!("No password found for account {account_id}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_secret(&self, account_id: &str, secret: &str) -> CredentialResult<()> {
        let entry = Entry::new(SERVICE_NAME, account_id)?;
        entry.set_password(secret)?;
        debug!("Stored password for account {account_id}");
        Ok(())
    }

    fn delete_secret(&self, account_id: &str) -> CredentialResult<()> {
        let entry = Entry::new(SERVICE_NAME, account_id)?;
        match entry.delete_credential() {
            Ok(()) => {
                debug!("Deleted password for account {account_id}");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No password to delete for account {account_id}");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete password: {e}");
                Err(e.into())
            }
        }
    }
}

/// [`SecretStore`] holding secrets in process memory.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl InMemorySecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with one secret.
    #[must_use]
    pub fn with_secret(account_id: impl Into<String>, secret: impl Into<String>) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(account_id.into(), secret.into());
        Self {
            secrets: Mutex::new(secrets),
        }
    }

    fn lock(&self) -> CredentialResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.secrets
            .lock()
            .map_err(|e| CredentialError::Unavailable(e.to_string()))
    }
}

impl SecretStore for InMemorySecretStore {
    fn get_secret(&self, account_id: &str) -> CredentialResult<Option<String>> {
        Ok(self.lock()?.get(account_id).cloned())
    }

    fn set_secret(&self, account_id: &str, secret: &str) -> CredentialResult<()> {
        self.lock()?.insert(account_id.to_string(), secret.to_string());
        Ok(())
    }

    fn delete_secret(&self, account_id: &str) -> CredentialResult<()> {
        self.lock()?.remove(account_id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let store = InMemorySecretStore::new();
        assert_eq!(store.get_secret("anna@example.com").unwrap(), None);

        store.set_secret("anna@example.com", "pw").unwrap();
        assert_eq!(store.get_secret("anna@example.com").unwrap().as_deref(), Some("pw"));

        store.delete_secret("anna@example.com").unwrap();
        store.delete_secret("anna@example.com").unwrap();
        assert_eq!(store.get_secret("anna@example.com").unwrap(), None);
    }

    #[test]
    fn test_in_memory_with_secret() {
        let store = InMemorySecretStore::with_secret("bob@example.org", "hunter2");
        assert_eq!(store.get_secret("bob@example.org").unwrap().as_deref(), Some("hunter2"));
    }

    // These tests interact with the actual system keyring. Run manually with
    // `cargo test -- --ignored`.

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_keyring_store_and_retrieve() {
        let store = KeyringSecretStore::new();
        let id = "mailstash-test-99999@example.com";

        store.set_secret(id, "test_password_12345").unwrap();
        assert_eq!(store.get_secret(id).unwrap().as_deref(), Some("test_password_12345"));

        store.delete_secret(id).unwrap();
        assert_eq!(store.get_secret(id).unwrap(), None);
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_keyring_delete_missing_is_ok() {
        let store = KeyringSecretStore::new();
        store.delete_secret("mailstash-test-missing@example.com").unwrap();
    }
}

//! Account management module.
//!
//! Provides account profiles, the accounts file, validation, and secret
//! storage.

pub mod credentials;
mod model;
mod store;
mod validation;

pub use credentials::{
    CredentialError, CredentialResult, InMemorySecretStore, KeyringSecretStore, SecretStore,
};
pub use model::{AccountProfile, OutboundServer, Protocol};
pub use store::{AccountStore, resolve_accounts_path};
pub use validation::{ValidationError, ValidationResult, validate_profile};

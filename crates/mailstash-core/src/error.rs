//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::account::CredentialError;
use crate::session::SessionError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input detected before any I/O: unknown account, missing
    /// secret, bad threshold, malformed profile.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mail server session failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Message could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] mailstash_mime::Error),

    /// Reading or writing the archive or accounts file failed.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The background job task failed.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Builds a [`Error::Filesystem`] for `path`.
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors that should stop the program before any work.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Credential(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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
    fn test_filesystem_display_names_path() {
        let err = Error::filesystem("/archive/x.eml", std::io::Error::other("disk full"));
        let text = err.to_string();
        assert!(text.contains("/archive/x.eml"));
        assert!(text.contains("disk full"));
        assert!(!err.is_config());
    }

    #[test]
    fn test_session_error_converts() {
        let err: Error = SessionError::Timeout("20s".into()).into();
        assert!(matches!(err, Error::Session(SessionError::Timeout(_))));
    }

    #[test]
    fn test_config_is_config() {
        assert!(Error::Config("no secret".into()).is_config());
    }
}

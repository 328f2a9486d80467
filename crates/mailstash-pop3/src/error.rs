//! POP3 client failures.

use std::io;
use std::time::Duration;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking POP3.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket read or write failed.
    #[error("connection failed: {0}")]
    Io(#[from] io::Error),

    /// TLS setup or record layer failed.
    #[error("TLS failure: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name cannot be used for certificate verification.
    #[error("host is not a valid TLS server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// `-ERR` status line, text after the indicator.
    #[error("server refused: {0}")]
    Negative(String),

    /// A line that is neither `+OK` nor `-ERR`, or a malformed listing.
    #[error("unexpected server behaviour: {0}")]
    Protocol(String),

    /// No complete answer within the I/O timeout.
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Whether the connection must be dropped.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Timeout(_) => true,
            Self::Negative(_) | Self::Protocol(_) => false,
        }
    }

    /// Whether the server answered `-ERR`.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        matches!(self, Self::Negative(_))
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
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_err_line_keeps_connection() {
        let err = Error::Negative("no such message".into());
        assert!(err.is_negative());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "server refused: no such message");
    }

    #[test]
    fn test_dead_connection_errors() {
        assert!(Error::Timeout(Duration::from_secs(20)).is_transport());
        assert!(Error::from(io::Error::from(io::ErrorKind::UnexpectedEof)).is_transport());
        assert!(!Error::Protocol("garbled LIST".into()).is_transport());
    }
}

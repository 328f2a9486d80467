//! IMAP client failures.
//!
//! The split that matters to callers is [`Error::is_transport`] versus
//! [`Error::is_rejection`]: the first means the connection is gone, the
//! second that the server said no and is still listening.

use std::time::Duration;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking IMAP.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket read or write failed.
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or record layer failed.
    #[error("TLS failure: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name cannot be used for certificate verification.
    #[error("host is not a valid TLS server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// A response line the parser could not read.
    #[error("unreadable response at byte {position}: {message}")]
    Parse {
        /// Offset into the response line.
        position: usize,
        /// What the parser expected.
        message: String,
    },

    /// Tagged `NO`.
    #[error("server refused: {0}")]
    No(String),

    /// Tagged `BAD`.
    #[error("server rejected command: {0}")]
    Bad(String),

    /// Untagged `BYE` outside LOGOUT.
    #[error("server closed the session: {0}")]
    Bye(String),

    /// No complete answer within the I/O timeout.
    #[error("no answer within {0:?}")]
    Timeout(Duration),

    /// Answer that makes no sense for the command sent.
    #[error("unexpected server behaviour: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether the connection must be dropped.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::Io(_)
            | Self::Tls(_)
            | Self::InvalidDnsName(_)
            | Self::Bye(_)
            | Self::Timeout(_) => true,
            Self::Parse { .. } | Self::No(_) | Self::Bad(_) | Self::Protocol(_) => false,
        }
    }

    /// Whether the server answered `NO` or `BAD`.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::No(_) | Self::Bad(_))
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
    fn test_dead_connection_errors() {
        let reset = Error::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        for err in [reset, Error::Timeout(Duration::from_secs(30)), Error::Bye("idle".into())] {
            assert!(err.is_transport(), "{err}");
            assert!(!err.is_rejection(), "{err}");
        }
    }

    #[test]
    fn test_live_connection_errors() {
        assert!(Error::No("over quota".into()).is_rejection());
        assert!(Error::Bad("unknown command".into()).is_rejection());
        let parse = Error::Parse {
            position: 4,
            message: "expected SP".into(),
        };
        assert!(!parse.is_transport());
        assert!(!parse.is_rejection());
        assert!(!Error::Protocol("missing tag".into()).is_transport());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::No("nope".into()).to_string(), "server refused: nope");
        assert_eq!(Error::Timeout(Duration::from_secs(5)).to_string(), "no answer within 5s");
    }
}

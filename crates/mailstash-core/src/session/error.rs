//! Session error taxonomy.
//!
//! Protocol crate errors are classified exactly once, here, when they cross
//! into the core. Everything above this boundary matches on variants rather
//! than on error text.

use std::io;

/// Failure of a [`MailSession`](super::MailSession) operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Transport failure: I/O, TLS, DNS name, or server disconnect.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server actively refused the TCP connection.
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Connect or command round-trip exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The server reported a temporary outage.
    #[error("Server temporarily unavailable: {0}")]
    TemporarilyUnavailable(String),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rejected command, unparseable response, or out-of-order call.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// Returns true for failures of the connection itself.
    #[must_use]
    pub const fn is_connection_level(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Refused(_)
                | Self::Timeout(_)
                | Self::TemporarilyUnavailable(_)
        )
    }

    /// Classifies an I/O error by kind, then by message.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        let text = err.to_string();
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused(text),
            io::ErrorKind::TimedOut => Self::Timeout(text),
            _ => classify_text(text, Self::Connection),
        }
    }
}

/// Maps well-known server and OS phrases onto variants.
///
/// `fallback` builds the variant used when no phrase matches.
fn classify_text(text: String, fallback: fn(String) -> SessionError) -> SessionError {
    let lower = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["connection refused"]) {
        SessionError::Refused(text)
    } else if has(&["timeout", "timed out"]) {
        SessionError::Timeout(text)
    } else if has(&[
        "authentication failed",
        "login failed",
        "invalid credentials",
        "authenticationfailed",
    ]) {
        SessionError::Authentication(text)
    } else if has(&["temporarily unavailable"]) {
        SessionError::TemporarilyUnavailable(text)
    } else {
        fallback(text)
    }
}

impl From<mailstash_imap::Error> for SessionError {
    fn from(err: mailstash_imap::Error) -> Self {
        use mailstash_imap::Error as E;

        match &err {
            E::Io(io) => Self::from_io(io),
            E::Timeout(_) => Self::Timeout(err.to_string()),
            E::Tls(_) | E::InvalidDnsName(_) | E::Bye(_) => {
                classify_text(err.to_string(), Self::Connection)
            }
            E::No(_) | E::Bad(_) => classify_text(err.to_string(), Self::Protocol),
            E::Parse { .. } | E::Protocol(_) => Self::Protocol(err.to_string()),
        }
    }
}

impl From<mailstash_pop3::Error> for SessionError {
    fn from(err: mailstash_pop3::Error) -> Self {
        use mailstash_pop3::Error as E;

        match &err {
            E::Io(io) => Self::from_io(io),
            E::Timeout(_) => Self::Timeout(err.to_string()),
            E::Tls(_) | E::InvalidDnsName(_) => classify_text(err.to_string(), Self::Connection),
            E::Negative(_) => classify_text(err.to_string(), Self::Protocol),
            E::Protocol(_) => Self::Protocol(err.to_string()),
        }
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
    use std::time::Duration;

    #[test]
    fn test_io_kind_classification() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "nope");
        assert!(matches!(SessionError::from_io(&refused), SessionError::Refused(_)));

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(matches!(SessionError::from_io(&timed_out), SessionError::Timeout(_)));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(SessionError::from_io(&reset), SessionError::Connection(_)));
    }

    #[test]
    fn test_io_text_classification() {
        let err = io::Error::other("Connection refused (os error 111)");
        assert!(matches!(SessionError::from_io(&err), SessionError::Refused(_)));

        let err = io::Error::other("resource temporarily unavailable");
        assert!(matches!(SessionError::from_io(&err), SessionError::TemporarilyUnavailable(_)));
    }

    #[test]
    fn test_imap_classification() {
        let err: SessionError = mailstash_imap::Error::Timeout(Duration::from_secs(20)).into();
        assert!(matches!(err, SessionError::Timeout(_)));
        assert!(err.is_connection_level());

        let err: SessionError =
            mailstash_imap::Error::No("[AUTHENTICATIONFAILED] bad".into()).into();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert!(!err.is_connection_level());

        let err: SessionError = mailstash_imap::Error::No("Mailbox doesn't exist".into()).into();
        assert!(matches!(err, SessionError::Protocol(_)));

        let err: SessionError = mailstash_imap::Error::Bye("shutting down".into()).into();
        assert!(matches!(err, SessionError::Connection(_)));

        let err: SessionError = mailstash_imap::Error::Parse {
            position: 3,
            message: "junk".into(),
        }
        .into();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn test_pop3_classification() {
        let err: SessionError =
            mailstash_pop3::Error::Negative("[AUTH] Login failed.".into()).into();
        assert!(matches!(err, SessionError::Authentication(_)));

        let err: SessionError = mailstash_pop3::Error::Negative("no such message".into()).into();
        assert!(matches!(err, SessionError::Protocol(_)));

        let err: SessionError =
            mailstash_pop3::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
                .into();
        assert!(matches!(err, SessionError::Refused(_)));
    }
}

//! Transport settings shared by every session a job opens.

use std::time::Duration;

/// Deadline for TCP connect plus TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for one command and its complete answer.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(20);

/// How the transport is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// TLS from the first byte (IMAPS, POP3S).
    #[default]
    Implicit,
    /// Cleartext TCP, for tests and local relays.
    None,
}

/// Deadlines and transport security for [`NetworkConnector`].
///
/// [`NetworkConnector`]: super::NetworkConnector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Connect deadline.
    pub connect_timeout: Duration,
    /// Per-command deadline.
    pub io_timeout: Duration,
    /// Transport security.
    pub tls: TlsMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            tls: TlsMode::Implicit,
        }
    }
}

impl SessionConfig {
    /// Replaces both deadlines.
    #[must_use]
    pub const fn with_timeouts(self, connect: Duration, io: Duration) -> Self {
        Self {
            connect_timeout: connect,
            io_timeout: io,
            ..self
        }
    }

    /// Replaces the transport security.
    #[must_use]
    pub const fn with_tls(self, tls: TlsMode) -> Self {
        Self { tls, ..self }
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
    fn test_default_is_implicit_tls() {
        let config = SessionConfig::default();
        assert_eq!(config.tls, TlsMode::Implicit);
        assert_eq!(
            (config.connect_timeout, config.io_timeout),
            (Duration::from_secs(15), Duration::from_secs(20))
        );
    }

    #[test]
    fn test_overrides_keep_other_fields() {
        let config = SessionConfig::default().with_tls(TlsMode::None);
        assert_eq!(config.io_timeout, DEFAULT_IO_TIMEOUT);

        let config = config.with_timeouts(Duration::from_secs(3), Duration::from_secs(5));
        assert_eq!(config.tls, TlsMode::None);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.io_timeout, Duration::from_secs(5));
    }
}

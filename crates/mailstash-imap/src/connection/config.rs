//! Where and how to reach an IMAP server.

use std::time::Duration;

/// Deadline for TCP setup plus the TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for one command and its complete answer.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS from the first byte, IMAPS.
    #[default]
    Implicit,
    /// Cleartext. Test servers and local relays only.
    None,
}

impl Security {
    /// IANA port for IMAP over this transport.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        if matches!(self, Self::Implicit) { 993 } else { 143 }
    }
}

/// Connection settings for [`connect`](super::connect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host name, also used for certificate verification.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Transport security.
    pub security: Security,
    /// See [`DEFAULT_CONNECT_TIMEOUT`].
    pub connect_timeout: Duration,
    /// See [`DEFAULT_IO_TIMEOUT`].
    pub io_timeout: Duration,
}

impl Config {
    /// IMAPS on port 993 with the default deadlines.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        let security = Security::default();
        Self {
            host: host.into(),
            port: security.default_port(),
            security,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Switches transport. The port follows unless set afterwards.
    #[must_use]
    pub fn with_security(mut self, security: Security) -> Self {
        self.port = security.default_port();
        self.security = security;
        self
    }

    /// Overrides the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides both deadlines.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
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
    fn test_imaps_by_default() {
        let config = Config::new("mail.example.org");
        assert_eq!((config.port, config.security), (993, Security::Implicit));
        assert_eq!(config.io_timeout, DEFAULT_IO_TIMEOUT);
    }

    #[test]
    fn test_port_follows_security_until_overridden() {
        assert_eq!(Config::new("h").with_security(Security::None).port, 143);
        let config = Config::new("h").with_security(Security::None).with_port(1143);
        assert_eq!(config.port, 1143);
        // Security set last wins over an earlier port.
        assert_eq!(Config::new("h").with_port(1143).with_security(Security::Implicit).port, 993);
    }

    #[test]
    fn test_timeouts() {
        let config = Config::new("h").with_timeouts(Duration::from_secs(3), Duration::from_secs(4));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.io_timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_setters_keep_host() {
        let config = Config::new(String::from("imap.example.net"))
            .with_security(Security::None)
            .with_port(10143)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(config.host, "imap.example.net");
        assert_eq!((config.port, config.security), (10143, Security::None));
    }
}

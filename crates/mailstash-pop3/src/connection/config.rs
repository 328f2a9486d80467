//! Where and how to reach a POP3 server.

use std::time::Duration;

/// Deadline for TCP setup plus the TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for one command and its complete answer, RETR included.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS from the first byte, POP3S.
    #[default]
    Implicit,
    /// Cleartext. Test servers and local relays only.
    None,
}

impl Security {
    /// IANA port for POP3 over this transport.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        if matches!(self, Self::Implicit) { 995 } else { 110 }
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
    /// POP3S on port 995 with the default deadlines.
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
    fn test_pop3s_by_default() {
        let config = Config::new("pop.example.org");
        assert_eq!((config.port, config.security), (995, Security::Implicit));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_cleartext_port() {
        assert_eq!(Config::new("h").with_security(Security::None).port, 110);
        assert_eq!(Config::new("h").with_security(Security::None).with_port(1110).port, 1110);
    }

    #[test]
    fn test_setters_keep_host() {
        let config = Config::new(String::from("pop.example.net"))
            .with_port(10110)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(config.host, "pop.example.net");
        assert_eq!(config.port, 10110);
        assert_eq!(config.io_timeout, Duration::from_secs(2));
    }
}

//! Opening sessions for account profiles.

use std::future::Future;

use tracing::{debug, info};

use super::{
    ImapSession, MailSession, Pop3Session, RemoteSession, SessionConfig, SessionError, TlsMode,
};
use crate::account::{AccountProfile, Protocol};

/// Opens sessions for accounts.
///
/// The pipeline only talks to this trait, so tests can substitute scripted
/// sessions for real servers.
pub trait SessionConnector: Send + Sync {
    /// Session type produced.
    type Session: MailSession;

    /// Connects to the account's inbound server and reads the greeting.
    ///
    /// The returned session is `Connected`, not yet authenticated.
    fn connect(
        &self,
        account: &AccountProfile,
    ) -> impl Future<Output = Result<Self::Session, SessionError>> + Send;
}

/// Connector that opens real TCP/TLS connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector {
    config: SessionConfig,
}

impl NetworkConnector {
    /// Creates a connector with the given timeouts and transport security.
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn connect_imap(&self, account: &AccountProfile) -> Result<RemoteSession, SessionError> {
        let security = match self.config.tls {
            TlsMode::Implicit => mailstash_imap::Security::Implicit,
            TlsMode::None => mailstash_imap::Security::None,
        };
        let config = mailstash_imap::Config::new(account.inbound_host.as_str())
            .with_security(security)
            .with_port(account.inbound_port)
            .with_timeouts(self.config.connect_timeout, self.config.io_timeout);

        let stream = mailstash_imap::connect(&config).await?;
        let session = ImapSession::open(stream, self.config.io_timeout).await?;
        Ok(RemoteSession::Imap(session))
    }

    async fn connect_pop3(&self, account: &AccountProfile) -> Result<RemoteSession, SessionError> {
        let security = match self.config.tls {
            TlsMode::Implicit => mailstash_pop3::Security::Implicit,
            TlsMode::None => mailstash_pop3::Security::None,
        };
        let config = mailstash_pop3::Config::new(account.inbound_host.as_str())
            .with_security(security)
            .with_port(account.inbound_port)
            .with_timeouts(self.config.connect_timeout, self.config.io_timeout);

        let stream = mailstash_pop3::connect(&config).await?;
        let session = Pop3Session::open(stream, self.config.io_timeout).await?;
        Ok(RemoteSession::Pop3(session))
    }
}

impl SessionConnector for NetworkConnector {
    type Session = RemoteSession;

    async fn connect(&self, account: &AccountProfile) -> Result<RemoteSession, SessionError> {
        debug!(
            account = %account.id,
            host = %account.inbound_host,
            port = account.inbound_port,
            protocol = %account.protocol,
            "Opening mail session"
        );

        let session = match account.protocol {
            Protocol::Imap => self.connect_imap(account).await?,
            Protocol::Pop3 => self.connect_pop3(account).await?,
        };

        info!(account = %account.id, protocol = %account.protocol, "Connected");
        Ok(session)
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
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::session::SessionState;

    fn plain() -> NetworkConnector {
        NetworkConnector::new(
            SessionConfig::default()
                .with_tls(TlsMode::None)
                .with_timeouts(Duration::from_secs(5), Duration::from_secs(5)),
        )
    }

    async fn greeting_server(greeting: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(greeting).await.unwrap();
            // Hold the socket open until the client goes away.
            let mut buf = [0u8; 64];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
        });
        port
    }

    #[tokio::test]
    async fn test_connect_imap_reads_greeting() {
        let port = greeting_server(b"* OK IMAP4rev1 ready\r\n").await;
        let account =
            AccountProfile::new("Anna", "anna@example.com", "127.0.0.1", port, Protocol::Imap);

        let session = plain().connect(&account).await.unwrap();
        assert!(matches!(session, RemoteSession::Imap(_)));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_pop3_reads_greeting() {
        let port = greeting_server(b"+OK POP3 ready\r\n").await;
        let account =
            AccountProfile::new("Anna", "anna@example.com", "127.0.0.1", port, Protocol::Pop3);

        let session = plain().connect(&account).await.unwrap();
        assert!(matches!(session, RemoteSession::Pop3(_)));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_level() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let account =
            AccountProfile::new("Anna", "anna@example.com", "127.0.0.1", port, Protocol::Imap);
        let err = plain().connect(&account).await.unwrap_err();
        assert!(err.is_connection_level());
    }

    #[test]
    fn test_default_is_implicit_tls() {
        assert_eq!(NetworkConnector::default().config().tls, TlsMode::Implicit);
    }
}

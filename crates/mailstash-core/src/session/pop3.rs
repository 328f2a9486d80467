//! POP3 implementation of [`MailSession`].

use std::fmt;
use std::time::Duration;

use mailstash_pop3::{Authorization, Client, Transaction, Transition};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::{MailSession, MessageId, SessionError, SessionState, out_of_order};
use crate::account::Protocol;

enum Pop3State<S> {
    Authorization(Client<S, Authorization>),
    Transaction(Client<S, Transaction>),
    Disconnected,
}

/// [`MailSession`] over a POP3 connection.
///
/// The maildrop is the only folder; RETR leaves messages on the server.
pub struct Pop3Session<S> {
    state: Pop3State<S>,
}

impl<S> fmt::Debug for Pop3Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pop3Session")
            .field("state", &self.session_state())
            .finish()
    }
}

impl<S> Pop3Session<S> {
    const fn session_state(&self) -> SessionState {
        match self.state {
            Pop3State::Authorization(_) => SessionState::Connected,
            Pop3State::Transaction(_) => SessionState::Authenticated,
            Pop3State::Disconnected => SessionState::Disconnected,
        }
    }
}

impl<S> Pop3Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Reads the server greeting from a connected stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is missing, late, or `-ERR`.
    pub async fn open(stream: S, io_timeout: Duration) -> Result<Self, SessionError> {
        let client = Client::from_stream_with_timeout(stream, io_timeout).await?;
        debug!(greeting = client.greeting(), "POP3 greeting");
        Ok(Self {
            state: Pop3State::Authorization(client),
        })
    }

    fn settle<T>(&mut self, result: mailstash_pop3::Result<T>) -> Result<T, SessionError> {
        result.map_err(|e| {
            if e.is_transport() {
                warn!(error = %e, "POP3 connection lost");
                self.state = Pop3State::Disconnected;
            }
            SessionError::from(e)
        })
    }
}

impl<S> MailSession for Pop3Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn state(&self) -> SessionState {
        self.session_state()
    }

    async fn authenticate(&mut self, user: &str, secret: &str) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, Pop3State::Disconnected) {
            Pop3State::Authorization(client) => match client.login(user, secret).await? {
                Transition::Accepted(client) => {
                    self.state = Pop3State::Transaction(client);
                    Ok(())
                }
                Transition::Refused { client, error } => {
                    self.state = Pop3State::Authorization(client);
                    Err(SessionError::Authentication(error.to_string()))
                }
            },
            other => {
                self.state = other;
                Err(out_of_order("authenticate", self.session_state()))
            }
        }
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), SessionError> {
        if matches!(self.state, Pop3State::Transaction(_)) {
            debug!(folder = name, "POP3 has a single maildrop, nothing to select");
            Ok(())
        } else {
            Err(out_of_order("select a folder", self.session_state()))
        }
    }

    async fn list_message_ids(&mut self) -> Result<Vec<MessageId>, SessionError> {
        let state = self.session_state();
        let Pop3State::Transaction(client) = &mut self.state else {
            return Err(out_of_order("list messages", state));
        };

        let result = client.list().await;
        let listing = self.settle(result)?;
        Ok(listing.into_iter().map(|info| MessageId::new(info.id)).collect())
    }

    async fn fetch_raw(&mut self, id: &MessageId) -> Result<Vec<u8>, SessionError> {
        let state = self.session_state();
        let Pop3State::Transaction(client) = &mut self.state else {
            return Err(out_of_order("fetch", state));
        };

        let result = client.retr(id.as_str()).await;
        self.settle(result)
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        Ok(vec![Protocol::Pop3.default_folder().to_string()])
    }

    async fn close(&mut self) {
        let result = match std::mem::replace(&mut self.state, Pop3State::Disconnected) {
            Pop3State::Authorization(client) => client.quit().await,
            Pop3State::Transaction(client) => client.quit().await,
            Pop3State::Disconnected => Ok(()),
        };
        if let Err(e) = result {
            debug!(error = %e, "QUIT failed, connection dropped anyway");
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
    clippy::similar_names,
)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(20);

    fn logged_in(builder: &mut Builder) -> &mut Builder {
        builder
            .read(b"+OK POP3 ready\r\n")
            .write(b"USER anna@example.com\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS pw\r\n")
            .read(b"+OK maildrop locked\r\n")
    }

    async fn login<S: AsyncRead + AsyncWrite + Unpin + Send>(stream: S) -> Pop3Session<S> {
        let mut session = Pop3Session::open(stream, TIMEOUT).await.unwrap();
        session.authenticate("anna@example.com", "pw").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        session
    }

    #[tokio::test]
    async fn test_select_is_noop_and_lists_ids() {
        let mock = logged_in(&mut Builder::new())
            .write(b"LIST\r\n")
            .read(b"+OK\r\n1 120\r\n2 200\r\n.\r\n")
            .build();

        let mut session = login(mock).await;
        session.select_folder("whatever").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);

        let ids = session.list_message_ids().await.unwrap();
        assert_eq!(ids, vec![MessageId::new("1"), MessageId::new("2")]);
    }

    #[tokio::test]
    async fn test_fetch_raw_retr() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 2\r\n")
            .read(b"+OK\r\nSubject: a\r\n\r\nbody\r\n.\r\n")
            .build();

        let mut session = login(mock).await;
        let raw = session.fetch_raw(&MessageId::new("2")).await.unwrap();
        assert_eq!(raw, b"Subject: a\r\n\r\nbody\r\n");
    }

    #[tokio::test]
    async fn test_fetch_negative_keeps_session() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 9\r\n")
            .read(b"-ERR no such message\r\n")
            .build();

        let mut session = login(mock).await;
        let err = session.fetch_raw(&MessageId::new("9")).await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_refused_pass_is_authentication() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER anna\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS wrong\r\n")
            .read(b"-ERR [AUTH] invalid password\r\n")
            .build();

        let mut session = Pop3Session::open(mock, TIMEOUT).await.unwrap();
        let err = session.authenticate("anna", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_select_before_login() {
        let mock = Builder::new().read(b"+OK ready\r\n").build();
        let mut session = Pop3Session::open(mock, TIMEOUT).await.unwrap();
        assert!(session.select_folder("inbox").await.is_err());
    }

    #[tokio::test]
    async fn test_drop_mid_retr_disconnects() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nSubject: a\r\n")
            .build();

        let mut session = login(mock).await;
        let err = session.fetch_raw(&MessageId::new("1")).await.unwrap_err();
        assert!(err.is_connection_level());
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_sends_quit() {
        let mock = logged_in(&mut Builder::new())
            .write(b"QUIT\r\n")
            .read(b"+OK bye\r\n")
            .build();

        let mut session = login(mock).await;
        assert_eq!(session.list_folders().await.unwrap(), vec!["inbox"]);
        session.close().await;
        assert!(!session.is_connected());
    }
}

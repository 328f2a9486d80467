//! Type-state POP3 client.
//!
//! A session starts in [`Authorization`] after the greeting and moves to
//! [`Transaction`] once USER and PASS are accepted. A `-ERR` to either of
//! them hands the connection back through [`Transition::Refused`].

#![allow(clippy::missing_errors_doc)]

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::config::DEFAULT_IO_TIMEOUT;
use super::framed::LineStream;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{join_lines, parse_listing_line, parse_reply, parse_stat};
use crate::types::{MailboxStat, MessageInfo, Reply};

/// Type-state marker for the authorization state.
#[derive(Debug)]
pub struct Authorization;

/// Type-state marker for the transaction state.
#[derive(Debug)]
pub struct Transaction;

/// Outcome of a command that changes the session state.
#[derive(Debug)]
pub enum Transition<Next, Current> {
    /// The server accepted; the session moved on.
    Accepted(Next),
    /// The server answered `-ERR`; the connection is still usable.
    Refused {
        /// The connection, unchanged.
        client: Current,
        /// The rejection.
        error: Error,
    },
}

/// POP3 client with type-state pattern.
pub struct Client<S, State> {
    stream: LineStream<S>,
    greeting: String,
    io_timeout: Duration,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("greeting", &self.greeting)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

impl<S> Client<S, Authorization>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_stream_with_timeout(stream, DEFAULT_IO_TIMEOUT).await
    }

    /// Like [`Self::from_stream`], with a custom per-command timeout.
    pub async fn from_stream_with_timeout(stream: S, io_timeout: Duration) -> Result<Self> {
        let mut stream = LineStream::new(stream);

        let line = tokio::time::timeout(io_timeout, stream.read_line())
            .await
            .map_err(|_| Error::Timeout(io_timeout))??;
        let greeting = parse_reply(&line)?.into_result()?;

        Ok(Self {
            stream,
            greeting: greeting.text,
            io_timeout,
            _state: PhantomData,
        })
    }

    /// Authenticates with USER and PASS.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Transition<Client<S, Transaction>, Self>> {
        let user = Command::User {
            name: username.to_string(),
        };
        if let Err(error) = self.send_command(&user).await?.into_result() {
            return Ok(Transition::Refused { client: self, error });
        }

        let pass = Command::Pass {
            password: password.to_string(),
        };
        if let Err(error) = self.send_command(&pass).await?.into_result() {
            return Ok(Transition::Refused { client: self, error });
        }

        tracing::debug!(user = username, "POP3 login accepted");
        Ok(Transition::Accepted(self.into_state()))
    }
}

impl<S> Client<S, Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the message count and total maildrop size.
    pub async fn stat(&mut self) -> Result<MailboxStat> {
        let reply = self.send_command(&Command::Stat).await?.into_result()?;
        parse_stat(&reply.text)
    }

    /// Returns the scan listing in server order.
    pub async fn list(&mut self) -> Result<Vec<MessageInfo>> {
        let lines = self.send_multiline(&Command::List).await?;
        lines.iter().map(|line| parse_listing_line(line)).collect()
    }

    /// Retrieves a message.
    ///
    /// Body lines are unstuffed and joined with CRLF; the `.` terminator is
    /// not part of the result.
    pub async fn retr(&mut self, id: &str) -> Result<Vec<u8>> {
        let cmd = Command::Retr { id: id.to_string() };
        let lines = self.send_multiline(&cmd).await?;
        Ok(join_lines(&lines))
    }

    /// Sends NOOP.
    pub async fn noop(&mut self) -> Result<()> {
        self.send_command(&Command::Noop).await?.into_result()?;
        Ok(())
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the greeting text.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Returns the per-command timeout.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Sends QUIT and closes the connection (available in any state).
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await;
        // Best effort; the server may already have dropped the connection.
        let _ = self.stream.get_mut().shutdown().await;
        reply?.into_result()?;
        Ok(())
    }

    /// Sends a command and reads its status line.
    ///
    /// A `-ERR` answer is returned as a reply, not an error.
    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::trace!(command = cmd.name(), "POP3 command");

        let io_timeout = self.io_timeout;
        let exchange = async {
            self.stream.write_command(&cmd.serialize()).await?;
            let line = self.stream.read_line().await?;
            parse_reply(&line)
        };

        tokio::time::timeout(io_timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(io_timeout))?
    }

    /// Sends a multi-line command and returns its raw body lines.
    ///
    /// Status line and body share one timeout.
    async fn send_multiline(&mut self, cmd: &Command) -> Result<Vec<Vec<u8>>> {
        tracing::trace!(command = cmd.name(), "POP3 command");

        let io_timeout = self.io_timeout;
        let exchange = async {
            self.stream.write_command(&cmd.serialize()).await?;
            let line = self.stream.read_line().await?;
            parse_reply(&line)?.into_result()?;
            self.stream.read_multiline().await
        };

        tokio::time::timeout(io_timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(io_timeout))?
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            greeting: self.greeting,
            io_timeout: self.io_timeout,
            _state: PhantomData,
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

    fn logged_in(builder: &mut Builder) -> &mut Builder {
        builder
            .read(b"+OK POP3 ready\r\n")
            .write(b"USER anna@example.com\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS pw\r\n")
            .read(b"+OK maildrop locked\r\n")
    }

    async fn login<S: AsyncRead + AsyncWrite + Unpin>(stream: S) -> Client<S, Transaction> {
        let client = Client::from_stream(stream).await.unwrap();
        assert_eq!(client.greeting(), "POP3 ready");
        match client.login("anna@example.com", "pw").await.unwrap() {
            Transition::Accepted(client) => client,
            Transition::Refused { error, .. } => panic!("login refused: {error}"),
        }
    }

    #[tokio::test]
    async fn test_greeting_err_fails() {
        let mock = Builder::new().read(b"-ERR too busy\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(err.is_negative());
    }

    #[tokio::test]
    async fn test_login_and_list() {
        let mock = logged_in(&mut Builder::new())
            .write(b"LIST\r\n")
            .read(b"+OK 2 messages (320 octets)\r\n1 120\r\n2 200\r\n.\r\n")
            .build();

        let mut client = login(mock).await;
        let ids: Vec<String> = client.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_login_refused_on_pass() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER anna\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS wrong\r\n")
            .read(b"-ERR [AUTH] authentication failed\r\n")
            .write(b"QUIT\r\n")
            .read(b"+OK bye\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let Transition::Refused { client, error } = client.login("anna", "wrong").await.unwrap()
        else {
            panic!("expected refusal");
        };
        assert!(error.to_string().contains("authentication failed"));
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_retr_unstuffs_and_drops_terminator() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 1\r\n")
            .read(b"+OK 40 octets\r\nSubject: hi\r\n\r\n..dot line\r\nend\r\n.\r\n")
            .build();

        let mut client = login(mock).await;
        let raw = client.retr("1").await.unwrap();
        assert_eq!(raw, b"Subject: hi\r\n\r\n.dot line\r\nend\r\n");
    }

    #[tokio::test]
    async fn test_retr_err_keeps_session() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 9\r\n")
            .read(b"-ERR no such message\r\n")
            .write(b"NOOP\r\n")
            .read(b"+OK\r\n")
            .build();

        let mut client = login(mock).await;
        let err = client.retr("9").await.unwrap_err();
        assert!(err.is_negative());
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stat() {
        let mock = logged_in(&mut Builder::new())
            .write(b"STAT\r\n")
            .read(b"+OK 2 320\r\n")
            .build();

        let mut client = login(mock).await;
        let stat = client.stat().await.unwrap();
        assert_eq!(stat, MailboxStat { count: 2, size: 320 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_retr_timeout() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nSubject: slow\r\n")
            .wait(Duration::from_secs(60))
            .build();

        let mut client = login(mock).await;
        let err = client.retr("1").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == DEFAULT_IO_TIMEOUT));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_drop_mid_body() {
        let mock = logged_in(&mut Builder::new())
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nSubject: cut\r\n")
            .build();

        let mut client = login(mock).await;
        let err = client.retr("1").await.unwrap_err();
        assert!(err.is_transport());
    }
}

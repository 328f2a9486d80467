//! Protocol-uniform mail sessions.
//!
//! A [`MailSession`] wraps one live IMAP or POP3 connection and moves through
//!
//! ```text
//! Disconnected → Connected → Authenticated ⇄ FolderSelected → Disconnected
//! ```
//!
//! POP3 never reaches `FolderSelected`; selecting its implicit folder is a
//! no-op. Calls made in the wrong state fail with
//! [`SessionError::Protocol`]. Transport failures drop the session to
//! `Disconnected`; server rejections leave the state as it was, except that
//! a rejected IMAP EXAMINE leaves no folder selected.

mod config;
mod connector;
mod error;
mod imap;
mod pop3;

use std::fmt;
use std::future::Future;

pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, SessionConfig, TlsMode};
pub use connector::{NetworkConnector, SessionConnector};
pub use error::SessionError;
pub use imap::ImapSession;
pub use pop3::Pop3Session;

use mailstash_imap::ImapStream;
use mailstash_pop3::Pop3Stream;

/// Opaque message handle valid for one session.
///
/// An IMAP sequence number from `SEARCH ALL` or a POP3 message number, kept
/// exactly as the server sent it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a server-issued id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as sent by the server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable connection.
    Disconnected,
    /// Greeting received, not logged in.
    Connected,
    /// Logged in, no folder open.
    Authenticated,
    /// A folder is open read-only (IMAP only).
    FolderSelected,
}

/// One live connection to a mail server.
pub trait MailSession: Send {
    /// Current lifecycle state.
    fn state(&self) -> SessionState;

    /// Returns false once a transport failure or close dropped the
    /// connection.
    fn is_connected(&self) -> bool {
        self.state() != SessionState::Disconnected
    }

    /// Logs in. Requires `Connected`.
    fn authenticate(
        &mut self,
        user: &str,
        secret: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Opens a folder read-only. A no-op success on POP3.
    fn select_folder(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Lists the ids of every message in the selected folder, in server
    /// order.
    fn list_message_ids(
        &mut self,
    ) -> impl Future<Output = Result<Vec<MessageId>, SessionError>> + Send;

    /// Fetches the raw RFC 822 bytes of one message.
    fn fetch_raw(
        &mut self,
        id: &MessageId,
    ) -> impl Future<Output = Result<Vec<u8>, SessionError>> + Send;

    /// Lists selectable folder names in server order.
    fn list_folders(&mut self) -> impl Future<Output = Result<Vec<String>, SessionError>> + Send;

    /// Says goodbye and drops the connection. Errors are ignored.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Network session for either protocol.
///
/// This is the only place the two protocols branch.
pub enum RemoteSession<I = ImapStream, P = Pop3Stream> {
    /// IMAP4rev1 session.
    Imap(ImapSession<I>),
    /// POP3 session.
    Pop3(Pop3Session<P>),
}

impl<I, P> fmt::Debug for RemoteSession<I, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imap(s) => f.debug_tuple("Imap").field(s).finish(),
            Self::Pop3(s) => f.debug_tuple("Pop3").field(s).finish(),
        }
    }
}

impl<I, P> MailSession for RemoteSession<I, P>
where
    I: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
    P: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    fn state(&self) -> SessionState {
        match self {
            Self::Imap(s) => s.state(),
            Self::Pop3(s) => s.state(),
        }
    }

    async fn authenticate(&mut self, user: &str, secret: &str) -> Result<(), SessionError> {
        match self {
            Self::Imap(s) => s.authenticate(user, secret).await,
            Self::Pop3(s) => s.authenticate(user, secret).await,
        }
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), SessionError> {
        match self {
            Self::Imap(s) => s.select_folder(name).await,
            Self::Pop3(s) => s.select_folder(name).await,
        }
    }

    async fn list_message_ids(&mut self) -> Result<Vec<MessageId>, SessionError> {
        match self {
            Self::Imap(s) => s.list_message_ids().await,
            Self::Pop3(s) => s.list_message_ids().await,
        }
    }

    async fn fetch_raw(&mut self, id: &MessageId) -> Result<Vec<u8>, SessionError> {
        match self {
            Self::Imap(s) => s.fetch_raw(id).await,
            Self::Pop3(s) => s.fetch_raw(id).await,
        }
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        match self {
            Self::Imap(s) => s.list_folders().await,
            Self::Pop3(s) => s.list_folders().await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Imap(s) => s.close().await,
            Self::Pop3(s) => s.close().await,
        }
    }
}

/// Error for a call made in the wrong lifecycle state.
fn out_of_order(operation: &str, state: SessionState) -> SessionError {
    SessionError::Protocol(format!("cannot {operation} in state {state:?}"))
}

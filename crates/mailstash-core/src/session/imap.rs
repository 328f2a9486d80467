//! IMAP implementation of [`MailSession`].

use std::fmt;
use std::time::Duration;

use mailstash_imap::{
    Authenticated, Client, MailboxArg, NotAuthenticated, SeqNum, Selected, Transition,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::{MailSession, MessageId, SessionError, SessionState, out_of_order};

/// Type-state client held by an [`ImapSession`].
enum ImapState<S> {
    Connected(Client<S, NotAuthenticated>),
    Authenticated(Client<S, Authenticated>),
    Selected(Client<S, Selected>),
    Disconnected,
}

/// [`MailSession`] over an IMAP connection.
///
/// Folders are opened with EXAMINE, so the source mailbox is never
/// modified.
pub struct ImapSession<S> {
    state: ImapState<S>,
    selected: Option<String>,
}

impl<S> fmt::Debug for ImapSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSession")
            .field("state", &self.session_state())
            .field("selected", &self.selected)
            .finish()
    }
}

impl<S> ImapSession<S> {
    const fn session_state(&self) -> SessionState {
        match self.state {
            ImapState::Connected(_) => SessionState::Connected,
            ImapState::Authenticated(_) => SessionState::Authenticated,
            ImapState::Selected(_) => SessionState::FolderSelected,
            ImapState::Disconnected => SessionState::Disconnected,
        }
    }

    fn take(&mut self) -> ImapState<S> {
        std::mem::replace(&mut self.state, ImapState::Disconnected)
    }

    /// Name of the open folder, if any.
    #[must_use]
    pub fn selected_folder(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Reads the server greeting from a connected stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is missing, late, or a BYE.
    pub async fn open(stream: S, io_timeout: Duration) -> Result<Self, SessionError> {
        let client = Client::from_stream_with_timeout(stream, io_timeout).await?;
        Ok(Self {
            state: ImapState::Connected(client),
            selected: None,
        })
    }

    /// Sends one EXAMINE, leaving the session authenticated on refusal.
    async fn examine(&mut self, mailbox: MailboxArg) -> mailstash_imap::Result<()> {
        let transition = match self.take() {
            ImapState::Authenticated(client) => client.examine(mailbox).await?,
            ImapState::Selected(client) => client.examine(mailbox).await?,
            other => {
                self.state = other;
                return Err(mailstash_imap::Error::Protocol(format!(
                    "EXAMINE not allowed in state {:?}",
                    self.session_state()
                )));
            }
        };

        match transition {
            Transition::Accepted(selected) => {
                self.state = ImapState::Selected(selected);
                Ok(())
            }
            Transition::Refused { client, error } => {
                self.state = ImapState::Authenticated(client);
                Err(error)
            }
        }
    }

    /// Maps a protocol result, dropping the connection on transport errors.
    fn settle<T>(&mut self, result: mailstash_imap::Result<T>) -> Result<T, SessionError> {
        result.map_err(|e| {
            if e.is_transport() {
                warn!(error = %e, "IMAP connection lost");
                self.state = ImapState::Disconnected;
                self.selected = None;
            }
            SessionError::from(e)
        })
    }
}

impl<S> MailSession for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn state(&self) -> SessionState {
        self.session_state()
    }

    async fn authenticate(&mut self, user: &str, secret: &str) -> Result<(), SessionError> {
        match self.take() {
            ImapState::Connected(client) => match client.login(user, secret).await? {
                Transition::Accepted(client) => {
                    debug!(user, "IMAP login accepted");
                    self.state = ImapState::Authenticated(client);
                    Ok(())
                }
                Transition::Refused { client, error } => {
                    self.state = ImapState::Connected(client);
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
        self.selected = None;
        if name.contains(['\r', '\n', '\0']) {
            return Err(SessionError::Protocol(format!(
                "folder name {name:?} contains a line break or NUL"
            )));
        }

        // Some servers only accept the quoted form, others only the bare one.
        let mut rejection = None;
        for mailbox in [MailboxArg::Quoted(name.to_string()), MailboxArg::Raw(name.to_string())] {
            match self.examine(mailbox).await {
                Ok(()) => {
                    debug!(folder = name, "Folder selected");
                    self.selected = Some(name.to_string());
                    return Ok(());
                }
                Err(e) if e.is_rejection() => {
                    debug!(folder = name, error = %e, "EXAMINE rejected");
                    rejection = Some(e);
                }
                Err(e) => return self.settle(Err(e)),
            }
        }

        let reason = rejection.map_or_else(String::new, |e| e.to_string());
        Err(SessionError::Protocol(format!("cannot select folder {name:?}: {reason}")))
    }

    async fn list_message_ids(&mut self) -> Result<Vec<MessageId>, SessionError> {
        let state = self.session_state();
        let ImapState::Selected(client) = &mut self.state else {
            return Err(out_of_order("list messages", state));
        };

        let result = client.search_all().await;
        let ids = self.settle(result)?;
        Ok(ids.into_iter().map(|seq| MessageId::new(seq.to_string())).collect())
    }

    async fn fetch_raw(&mut self, id: &MessageId) -> Result<Vec<u8>, SessionError> {
        let seq: SeqNum = id
            .as_str()
            .parse()
            .map_err(|_| SessionError::Protocol(format!("invalid IMAP sequence number {id}")))?;

        let state = self.session_state();
        let ImapState::Selected(client) = &mut self.state else {
            return Err(out_of_order("fetch", state));
        };

        let result = client.fetch_rfc822(seq).await;
        self.settle(result)
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        let state = self.session_state();
        let result = match &mut self.state {
            ImapState::Authenticated(client) => client.list("", "*").await,
            ImapState::Selected(client) => client.list("", "*").await,
            _ => return Err(out_of_order("list folders", state)),
        };

        let entries = self.settle(result)?;
        Ok(entries
            .into_iter()
            .filter(mailstash_imap::ListResponse::is_selectable)
            .map(|entry| entry.name)
            .collect())
    }

    async fn close(&mut self) {
        self.selected = None;
        match self.take() {
            ImapState::Connected(client) => client.logout().await,
            ImapState::Authenticated(client) => client.logout().await,
            ImapState::Selected(client) => client.logout().await,
            ImapState::Disconnected => {}
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
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(20);

    fn authenticated(builder: &mut Builder) -> &mut Builder {
        builder
            .read(b"* OK IMAP4rev1 ready\r\n")
            .write(b"A0001 LOGIN anna@example.com pw\r\n")
            .read(b"A0001 OK done\r\n")
    }

    async fn login<S: AsyncRead + AsyncWrite + Unpin + Send>(stream: S) -> ImapSession<S> {
        let mut session = ImapSession::open(stream, TIMEOUT).await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        session.authenticate("anna@example.com", "pw").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        session
    }

    #[tokio::test]
    async fn test_quoted_rejected_then_bare_accepted() {
        let mock = authenticated(&mut Builder::new())
            .write(b"A0002 EXAMINE \"Archiv\"\r\n")
            .read(b"A0002 NO no such mailbox\r\n")
            .write(b"A0003 EXAMINE Archiv\r\n")
            .read(b"* 3 EXISTS\r\nA0003 OK [READ-ONLY] done\r\n")
            .build();

        let mut session = login(mock).await;
        session.select_folder("Archiv").await.unwrap();
        assert_eq!(session.state(), SessionState::FolderSelected);
        assert_eq!(session.selected_folder(), Some("Archiv"));
    }

    #[tokio::test]
    async fn test_both_forms_rejected() {
        let mock = authenticated(&mut Builder::new())
            .write(b"A0002 EXAMINE \"Nope\"\r\n")
            .read(b"A0002 NO no such mailbox\r\n")
            .write(b"A0003 EXAMINE Nope\r\n")
            .read(b"A0003 BAD syntax\r\n")
            .build();

        let mut session = login(mock).await;
        let err = session.select_folder("Nope").await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.selected_folder(), None);
    }

    #[tokio::test]
    async fn test_folder_name_with_line_break_never_sent() {
        let mock = authenticated(&mut Builder::new()).build();

        let mut session = login(mock).await;
        for name in ["INBOX\r\nA0099 DELETE INBOX", "Sent\n", "Ar\0chiv"] {
            let err = session.select_folder(name).await.unwrap_err();
            assert!(matches!(err, SessionError::Protocol(ref text) if text.contains("line break")));
            assert_eq!(session.state(), SessionState::Authenticated);
            assert_eq!(session.selected_folder(), None);
        }
    }

    #[tokio::test]
    async fn test_rejected_reselect_leaves_no_folder() {
        let mock = authenticated(&mut Builder::new())
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n")
            .write(b"A0003 EXAMINE \"Gone\"\r\n")
            .read(b"A0003 NO gone\r\n")
            .write(b"A0004 EXAMINE Gone\r\n")
            .read(b"A0004 NO gone\r\n")
            .build();

        let mut session = login(mock).await;
        session.select_folder("INBOX").await.unwrap();
        assert!(session.select_folder("Gone").await.is_err());
        assert_eq!(session.state(), SessionState::Authenticated);

        let err = session.list_message_ids().await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_list_and_fetch() {
        let mock = authenticated(&mut Builder::new())
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n")
            .write(b"A0003 SEARCH ALL\r\n")
            .read(b"* SEARCH 1 42\r\nA0003 OK done\r\n")
            .write(b"A0004 FETCH 42 (RFC822)\r\n")
            .read(b"* 42 FETCH (RFC822 {9}\r\nSubject:x)\r\nA0004 OK done\r\n")
            .build();

        let mut session = login(mock).await;
        session.select_folder("INBOX").await.unwrap();

        let ids = session.list_message_ids().await.unwrap();
        assert_eq!(ids, vec![MessageId::new("1"), MessageId::new("42")]);

        let raw = session.fetch_raw(&ids[1]).await.unwrap();
        assert_eq!(raw, b"Subject:x");
    }

    #[tokio::test]
    async fn test_login_refused_is_authentication() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna@example.com pw\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();

        let mut session = ImapSession::open(mock, TIMEOUT).await.unwrap();
        let err = session.authenticate("anna@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_out_of_order_fetch() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();

        let mut session = ImapSession::open(mock, TIMEOUT).await.unwrap();
        let err = session.fetch_raw(&MessageId::new("1")).await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_disconnects() {
        let mock = authenticated(&mut Builder::new())
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n")
            .write(b"A0003 FETCH 42 (RFC822)\r\n")
            .wait(Duration::from_secs(60))
            .build();

        let mut session = login(mock).await;
        session.select_folder("INBOX").await.unwrap();

        let err = session.fetch_raw(&MessageId::new("42")).await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_list_folders_drops_noselect() {
        let mock = authenticated(&mut Builder::new())
            .write(b"A0002 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\Noselect \\HasChildren) \"/\" Archive\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" \"Archive/2023\"\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 LOGOUT\r\n")
            .read(b"* BYE bye\r\nA0003 OK done\r\n")
            .build();

        let mut session = login(mock).await;
        let folders = session.list_folders().await.unwrap();
        assert_eq!(folders, vec!["INBOX", "Archive/2023"]);

        session.close().await;
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}

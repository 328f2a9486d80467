//! Type-state IMAP client connection.
//!
//! The connection states are:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after LOGIN
//! - `Selected`: after EXAMINE
//!
//! Each state only exposes the commands valid in it. State changes that the
//! server may refuse return a [`Transition`], so a rejected LOGIN or EXAMINE
//! hands the connection back instead of dropping it. Transport failures are
//! returned as `Err` and consume the client.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::config::DEFAULT_IO_TIMEOUT;
use super::framed::{Bye, FramedStream, completes};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) io_timeout: Duration,
    pub(crate) state: State,
}

/// Outcome of a command that changes the connection state.
#[derive(Debug)]
pub enum Transition<Next, Current> {
    /// The server accepted; the connection moved on.
    Accepted(Next),
    /// The server answered NO or BAD; the connection is still usable.
    Refused {
        /// The connection, in the state the server left it in.
        client: Current,
        /// The rejection.
        error: Error,
    },
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns the per-command timeout.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Sends a NOOP command.
    pub async fn noop(&mut self) -> Result<()> {
        let (tag, responses) = self.execute(&Command::Noop).await?;
        check_tagged_ok(&responses, &tag)
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let (tag, responses) = self.execute(&Command::Capability).await?;
        check_tagged_ok(&responses, &tag)?;
        self.absorb_capabilities(&responses);
        Ok(self.capabilities.clone())
    }

    /// Sends LOGOUT and closes the stream. Errors are ignored.
    pub async fn logout(mut self) {
        if let Err(e) = self.execute(&Command::Logout).await {
            tracing::debug!(error = %e, "LOGOUT failed, closing anyway");
        }
        let _ = self.stream.get_mut().shutdown().await;
    }

    /// Sends a command and collects every response up to its completion.
    ///
    /// The whole round-trip is bounded by the I/O timeout. Returns the tag
    /// used and the raw responses, the tagged completion last.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<(String, Vec<Vec<u8>>)> {
        let tag = self.tag_gen.next_tag();
        let serialized = command.serialize(&tag);
        let timeout = self.io_timeout;
        tracing::trace!(tag = %tag, command = command.name(), "Sending IMAP command");

        let exchange = async {
            let chunks = serialized.chunks();
            let mut early = Vec::new();

            for (i, chunk) in chunks.iter().enumerate() {
                self.stream.write_command(chunk).await?;
                if i + 1 == chunks.len() {
                    break;
                }
                // Wait for the server to accept the literal.
                loop {
                    let response = self.stream.read_response().await?;
                    if response.starts_with(b"+") {
                        break;
                    }
                    let done = completes(&response, &tag);
                    early.push(response);
                    if done {
                        return Ok(early);
                    }
                }
            }

            let bye = if matches!(command, Command::Logout) { Bye::Expected } else { Bye::Fatal };
            let mut responses = self.stream.read_until_tagged(&tag, bye).await?;
            early.append(&mut responses);
            Ok::<_, Error>(early)
        };

        let responses = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        Ok((tag, responses))
    }

    pub(crate) fn absorb_capabilities(&mut self, responses: &[Vec<u8>]) {
        for raw in responses {
            match ResponseParser::parse(raw) {
                Ok(Response::Untagged(UntaggedResponse::Capability(caps))) => {
                    self.capabilities = caps;
                }
                Ok(
                    Response::Tagged {
                        code: Some(ResponseCode::Capability(caps)),
                        ..
                    }
                    | Response::Untagged(UntaggedResponse::Status {
                        code: Some(ResponseCode::Capability(caps)),
                        ..
                    }),
                ) => self.capabilities = caps,
                _ => {}
            }
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn into_state<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            io_timeout: self.io_timeout,
            state,
        }
    }
}

/// Checks that the completion for `tag` is OK.
pub(crate) fn check_tagged_ok(responses: &[Vec<u8>], tag: &str) -> Result<()> {
    let Some(last) = responses.iter().rev().find(|r| completes(r, tag)) else {
        return Err(Error::Protocol(format!("missing tagged response for {tag}")));
    };

    match ResponseParser::parse(last) {
        Ok(response) => response.as_error().map_or(Ok(()), Err),
        // Unparseable completions still carry a readable status word.
        Err(_) => {
            let text = String::from_utf8_lossy(&last[tag.len()..]).trim().to_string();
            let word = text.split_ascii_whitespace().next().unwrap_or_default();
            match Status::from_word(word) {
                Some(Status::Ok | Status::PreAuth) => Ok(()),
                Some(Status::No) => Err(Error::No(text)),
                _ => Err(Error::Bad(text)),
            }
        }
    }
}

/// Returns the status of the tagged completion, for diagnostics.
pub(crate) fn tagged_status(
    responses: &[Vec<u8>],
    tag: &str,
) -> Option<(Status, Option<ResponseCode>)> {
    responses.iter().rev().find(|r| completes(r, tag)).and_then(|raw| {
        match ResponseParser::parse(raw) {
            Ok(Response::Tagged { status, code, .. }) => Some((status, code)),
            _ => None,
        }
    })
}

/// Splits a rejection off a completed exchange.
///
/// `Ok(None)` means the command succeeded, `Ok(Some(error))` that the server
/// refused it, and `Err` that the exchange itself is unusable.
pub(crate) fn rejection(responses: &[Vec<u8>], tag: &str) -> Result<Option<Error>> {
    match check_tagged_ok(responses, tag) {
        Ok(()) => Ok(None),
        Err(error) if error.is_rejection() => Ok(Some(error)),
        Err(error) => Err(error),
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

    fn lines(items: &[&[u8]]) -> Vec<Vec<u8>> {
        items.iter().map(|l| l.to_vec()).collect()
    }

    #[test]
    fn test_check_tagged_ok() {
        let ok = lines(&[b"* 1 EXISTS\r\n", b"A0001 OK done\r\n"]);
        assert!(check_tagged_ok(&ok, "A0001").is_ok());

        let no = lines(&[b"A0001 NO [NONEXISTENT] Unknown Mailbox\r\n"]);
        assert!(matches!(check_tagged_ok(&no, "A0001"), Err(Error::No(_))));

        let bad = lines(&[b"A0001 BAD Error in IMAP command\r\n"]);
        assert!(matches!(check_tagged_ok(&bad, "A0001"), Err(Error::Bad(_))));
    }

    #[test]
    fn test_check_tagged_ok_missing() {
        let untagged = lines(&[b"* OK hi\r\n"]);
        assert!(matches!(check_tagged_ok(&untagged, "A0001"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_check_tagged_ok_unparseable_completion() {
        let odd = lines(&[b"A0001 NO \"broken\r\n"]);
        assert!(matches!(check_tagged_ok(&odd, "A0001"), Err(Error::No(_))));
    }

    #[test]
    fn test_tagged_status() {
        let no = lines(&[b"A0003 NO [AUTHENTICATIONFAILED] nope\r\n"]);
        assert_eq!(
            tagged_status(&no, "A0003"),
            Some((Status::No, Some(ResponseCode::AuthenticationFailed)))
        );
    }

    #[test]
    fn test_rejection_split() {
        let ok = lines(&[b"A0001 OK\r\n"]);
        assert!(rejection(&ok, "A0001").unwrap().is_none());
        let no = lines(&[b"A0001 NO nope\r\n"]);
        assert!(rejection(&no, "A0001").unwrap().is_some());
        assert!(rejection(&[], "A0001").is_err());
    }
}

//! Implementation for the not-authenticated state.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, NotAuthenticated};
use super::{Client, DEFAULT_IO_TIMEOUT, Transition, rejection, tagged_status};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and initial capabilities.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_stream_with_timeout(stream, DEFAULT_IO_TIMEOUT).await
    }

    /// Like [`Self::from_stream`], with a custom per-command timeout.
    ///
    /// The timeout also bounds the wait for the greeting.
    pub async fn from_stream_with_timeout(stream: S, io_timeout: Duration) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = tokio::time::timeout(io_timeout, framed.read_response())
            .await
            .map_err(|_| Error::Timeout(io_timeout))??;

        let mut capabilities = Vec::new();
        match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Status { status, code, text }) => {
                if let Some(ResponseCode::Capability(caps)) = code {
                    capabilities = caps;
                }
                if status == Status::Bye {
                    return Err(Error::Bye(text));
                }
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            io_timeout,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// A NO or BAD answer returns the unauthenticated client in
    /// [`Transition::Refused`].
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Transition<Client<S, Authenticated>, Self>> {
        if self.has_capability(&Capability::LoginDisabled) {
            tracing::debug!("server advertises LOGINDISABLED, not sending credentials");
            return Ok(Transition::Refused {
                client: self,
                error: Error::No("LOGIN is disabled on this connection".to_string()),
            });
        }

        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let (tag, responses) = self.execute(&command).await?;

        if let Some(error) = rejection(&responses, &tag)? {
            if let Some((status, code)) = tagged_status(&responses, &tag)
                && status.is_refusal()
            {
                tracing::debug!(?status, ?code, "LOGIN refused");
            }
            return Ok(Transition::Refused { client: self, error });
        }

        self.absorb_capabilities(&responses);
        tracing::debug!(user = username, "IMAP login accepted");
        Ok(Transition::Accepted(self.into_state(Authenticated)))
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

    #[tokio::test]
    async fn test_greeting_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.has_capability(&Capability::Imap4Rev1));
        assert!(client.has_capability(&Capability::Auth("PLAIN".to_string())));
    }

    #[tokio::test]
    async fn test_greeting_bye() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_login_accepted() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna@example.com secret\r\n")
            .read(b"A0001 OK [CAPABILITY IMAP4rev1 X-ARCHIVE] Logged in\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();

        let Transition::Accepted(client) = client.login("anna@example.com", "secret").await.unwrap()
        else {
            panic!("login refused");
        };
        assert!(client.has_capability(&Capability::Other("X-ARCHIVE".to_string())));
    }

    #[tokio::test]
    async fn test_login_refused_keeps_connection() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna wrong\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] Authentication failed.\r\n")
            .write(b"A0002 NOOP\r\n")
            .read(b"A0002 OK NOOP completed\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();

        let Transition::Refused { mut client, error } = client.login("anna", "wrong").await.unwrap()
        else {
            panic!("login accepted");
        };
        assert!(matches!(error, Error::No(ref text) if text == "Authentication failed."));
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_disabled_sends_nothing() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 LOGINDISABLED] plaintext port\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();

        let Transition::Refused { error, .. } = client.login("anna", "secret").await.unwrap() else {
            panic!("login accepted");
        };
        assert!(error.is_rejection());
    }

    #[tokio::test]
    async fn test_login_literal_password() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna {5}\r\n")
            .read(b"+ go ahead\r\n")
            .write("grün\r\n".as_bytes())
            .read(b"A0001 OK Logged in\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        assert!(matches!(
            client.login("anna", "grün").await.unwrap(),
            Transition::Accepted(_)
        ));
    }

    #[tokio::test]
    async fn test_login_connection_drop_is_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna secret\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let err = client.login("anna", "secret").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_timeout() {
        let mock = Builder::new().wait(Duration::from_secs(60)).build();
        let err = Client::from_stream_with_timeout(mock, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(5)));
    }
}

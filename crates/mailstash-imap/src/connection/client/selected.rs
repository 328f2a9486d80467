//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::authenticated::{list, summarize_examine};
use super::states::{Authenticated, Selected};
use super::{Client, Transition, check_tagged_ok, rejection};
use crate::command::{Command, MailboxArg};
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{ExamineSummary, ListResponse, SeqNum};
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Name of the open folder.
    #[must_use]
    pub fn folder(&self) -> &str {
        self.state.folder()
    }

    /// What the server reported when the folder was opened.
    #[must_use]
    pub const fn summary(&self) -> ExamineSummary {
        self.state.summary()
    }

    /// Switches to another mailbox.
    ///
    /// The server deselects the current mailbox before it tries the new one,
    /// so a refusal leaves the connection authenticated without a mailbox.
    pub async fn examine(
        mut self,
        mailbox: MailboxArg,
    ) -> Result<Transition<Self, Client<S, Authenticated>>> {
        let (tag, responses) = self.execute(&Command::Examine { mailbox: mailbox.clone() }).await?;

        if let Some(error) = rejection(&responses, &tag)? {
            return Ok(Transition::Refused {
                client: self.into_state(Authenticated),
                error,
            });
        }

        let summary = summarize_examine(&responses);
        tracing::debug!(folder = mailbox.name(), exists = summary.exists, "Folder examined");
        Ok(Transition::Accepted(
            self.into_state(Selected::new(mailbox.name().to_string(), summary)),
        ))
    }

    /// Lists mailboxes matching a pattern.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        list(self, reference, pattern).await
    }

    /// Returns every message in the mailbox (`SEARCH ALL`), in server order.
    pub async fn search_all(&mut self) -> Result<Vec<SeqNum>> {
        let (tag, responses) = self.execute(&Command::SearchAll).await?;
        check_tagged_ok(&responses, &tag)?;

        let mut results = Vec::new();
        for raw in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Search(ids))) =
                ResponseParser::parse(raw)
            {
                results.extend(ids);
            }
        }
        Ok(results)
    }

    /// Fetches one complete message with `FETCH n (RFC822)`.
    ///
    /// The bytes come from the structured FETCH data when it parses. Servers
    /// that send something slightly off get a best-effort extraction: the
    /// first line is dropped along with the closing parenthesis.
    pub async fn fetch_rfc822(&mut self, seq: SeqNum) -> Result<Vec<u8>> {
        let (tag, responses) = self.execute(&Command::FetchRfc822(seq)).await?;
        check_tagged_ok(&responses, &tag)?;

        let fetches: Vec<&Vec<u8>> = responses
            .iter()
            .filter(|raw| {
                raw.starts_with(b"* ") && !raw.starts_with(b"* OK") && !raw.starts_with(b"* NO")
            })
            .collect();

        for raw in &fetches {
            if let Ok(Response::Untagged(UntaggedResponse::Fetch { seq: got, items })) =
                ResponseParser::parse(raw)
                && got == seq
            {
                let body = items.into_iter().find_map(|item| match item {
                    FetchItem::Body {
                        section: None,
                        data: Some(data),
                    } => Some(data),
                    FetchItem::Body {
                        section: Some(s),
                        data: Some(data),
                    } if s.is_empty() => Some(data),
                    _ => None,
                });
                if let Some(body) = body {
                    return Ok(body);
                }
            }
        }

        for raw in fetches {
            if let Some(body) = blob_fallback(raw) {
                tracing::debug!(%seq, "Using fallback extraction for FETCH data");
                return Ok(body);
            }
        }

        Err(Error::Protocol(format!("no message data for message {seq}")))
    }
}

/// Drops the first line and a trailing `)` from a raw FETCH response.
fn blob_fallback(raw: &[u8]) -> Option<Vec<u8>> {
    if !contains(raw, b"FETCH") {
        return None;
    }
    let start = raw.iter().position(|&b| b == b'\n')? + 1;
    let mut body = &raw[start..];
    body = trim_end(body);
    if let Some(stripped) = body.strip_suffix(b")") {
        body = trim_end(stripped);
    }
    (!body.is_empty()).then(|| body.to_vec())
}

fn trim_end(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., last] = bytes
        && last.is_ascii_whitespace()
    {
        bytes = rest;
    }
    bytes
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w.eq_ignore_ascii_case(needle))
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

    type Mock = tokio_test::io::Mock;

    fn script() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna secret\r\n")
            .read(b"A0001 OK Logged in\r\n")
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"* 2 EXISTS\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n");
        builder
    }

    async fn selected(mock: Mock) -> Client<Mock, Selected> {
        let client = Client::from_stream(mock).await.unwrap();
        let Transition::Accepted(client) = client.login("anna", "secret").await.unwrap() else {
            panic!("login refused");
        };
        let examined = client.examine(MailboxArg::Quoted("INBOX".into())).await.unwrap();
        let Transition::Accepted(client) = examined else {
            panic!("examine refused");
        };
        client
    }

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    #[test]
    fn test_blob_fallback() {
        assert_eq!(
            blob_fallback(b"* 42 FETCH (RFC822 {5}\r\nhello BROKEN\r\n").unwrap(),
            b"hello BROKEN"
        );
        assert_eq!(blob_fallback(b"* 1 FETCH (RFC822 {3}\r\nabc)\r\n").unwrap(), b"abc");
        assert!(blob_fallback(b"* 1 EXISTS\r\n").is_none());
        assert!(blob_fallback(b"* 1 FETCH (RFC822 {0}\r\n)\r\n").is_none());
    }

    #[tokio::test]
    async fn test_search_all() {
        let mock = script()
            .write(b"A0003 SEARCH ALL\r\n")
            .read(b"* SEARCH 1 2\r\n")
            .read(b"A0003 OK SEARCH completed\r\n")
            .build();
        let mut client = selected(mock).await;

        assert_eq!(client.search_all().await.unwrap(), vec![seq(1), seq(2)]);
    }

    #[tokio::test]
    async fn test_fetch_rfc822_literal() {
        let message = b"Subject: hi\r\n\r\nbody\r\n";
        let mut header = format!("* 2 FETCH (RFC822 {{{}}}\r\n", message.len()).into_bytes();
        header.extend_from_slice(message);
        header.extend_from_slice(b")\r\n");

        let mock = script()
            .write(b"A0003 FETCH 2 (RFC822)\r\n")
            .read(&header)
            .read(b"A0003 OK FETCH completed\r\n")
            .build();
        let mut client = selected(mock).await;

        assert_eq!(client.fetch_rfc822(seq(2)).await.unwrap(), message);
    }

    #[tokio::test]
    async fn test_fetch_rfc822_short_literal_count() {
        // 18 announced, 19 sent: the last LF spills into a line of its own.
        let mock = script()
            .write(b"A0003 FETCH 1 (RFC822)\r\n")
            .read(b"* 1 FETCH (RFC822 {18}\r\nSubject: one\r\n\r\nA\r\n)\r\n")
            .read(b"A0003 OK FETCH completed\r\n")
            .build();
        let mut client = selected(mock).await;

        assert_eq!(client.fetch_rfc822(seq(1)).await.unwrap(), b"Subject: one\r\n\r\nA");
    }

    #[tokio::test]
    async fn test_fetch_rfc822_with_unsolicited_flags() {
        let mock = script()
            .write(b"A0003 FETCH 1 (RFC822)\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen) RFC822 {4}\r\nabcd)\r\n")
            .read(b"* 2 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"A0003 OK done\r\n")
            .build();
        let mut client = selected(mock).await;

        assert_eq!(client.fetch_rfc822(seq(1)).await.unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_fetch_rfc822_no() {
        let mock = script()
            .write(b"A0003 FETCH 9 (RFC822)\r\n")
            .read(b"A0003 NO Message has been expunged\r\n")
            .build();
        let mut client = selected(mock).await;

        let err = client.fetch_rfc822(seq(9)).await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_fetch_without_data_is_protocol_error() {
        let mock = script()
            .write(b"A0003 FETCH 1 (RFC822)\r\n")
            .read(b"A0003 OK done\r\n")
            .build();
        let mut client = selected(mock).await;

        assert!(matches!(client.fetch_rfc822(seq(1)).await, Err(Error::Protocol(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let mock = script()
            .write(b"A0003 FETCH 1 (RFC822)\r\n")
            .wait(std::time::Duration::from_secs(120))
            .build();
        let mut client = selected(mock).await;

        let err = client.fetch_rfc822(seq(1)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_examine_refused_drops_selection() {
        let mock = script()
            .write(b"A0003 EXAMINE \"Missing\"\r\n")
            .read(b"A0003 NO [NONEXISTENT] Unknown mailbox\r\n")
            .build();
        let client = selected(mock).await;

        let examined = client.examine(MailboxArg::Quoted("Missing".into())).await.unwrap();
        let Transition::Refused { client, error } = examined else {
            panic!("examine accepted");
        };
        assert!(error.is_rejection());
        let _authenticated: Client<Mock, Authenticated> = client;
    }

    #[tokio::test]
    async fn test_logout_ignores_bye() {
        let mock = script()
            .write(b"A0003 LOGOUT\r\n")
            .read(b"* BYE bye\r\n")
            .read(b"A0003 OK LOGOUT completed\r\n")
            .build();
        let client = selected(mock).await;
        client.logout().await;
    }
}

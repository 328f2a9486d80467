//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, Transition, check_tagged_ok, rejection};
use crate::command::{Command, MailboxArg};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{ExamineSummary, ListResponse, ResponseCode};
use crate::Result;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a mailbox read-only with EXAMINE.
    pub async fn examine(
        mut self,
        mailbox: MailboxArg,
    ) -> Result<Transition<Client<S, Selected>, Self>> {
        let (tag, responses) = self.execute(&Command::Examine { mailbox: mailbox.clone() }).await?;

        if let Some(error) = rejection(&responses, &tag)? {
            return Ok(Transition::Refused { client: self, error });
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
}

/// LIST is valid in both authenticated and selected state.
pub(super) async fn list<S, State>(
    client: &mut Client<S, State>,
    reference: &str,
    pattern: &str,
) -> Result<Vec<ListResponse>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let command = Command::List {
        reference: reference.to_string(),
        pattern: pattern.to_string(),
    };
    let (tag, responses) = client.execute(&command).await?;
    check_tagged_ok(&responses, &tag)?;

    let mut mailboxes = Vec::new();
    for raw in &responses {
        match ResponseParser::parse(raw) {
            Ok(Response::Untagged(UntaggedResponse::List(item))) => mailboxes.push(item),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping unparseable LIST line"),
        }
    }
    Ok(mailboxes)
}

/// Picks EXISTS, UIDVALIDITY and READ-ONLY out of an EXAMINE exchange.
///
/// Lines that do not parse are skipped; they carry nothing the archiver
/// relies on.
pub(super) fn summarize_examine(responses: &[Vec<u8>]) -> ExamineSummary {
    responses
        .iter()
        .filter_map(|raw| ResponseParser::parse(raw).ok())
        .fold(ExamineSummary::default(), |mut summary, response| {
            match response {
                Response::Untagged(UntaggedResponse::Exists(n)) => summary.exists = n,
                Response::Untagged(UntaggedResponse::Status { code: Some(code), .. })
                | Response::Tagged { code: Some(code), .. } => match code {
                    ResponseCode::UidValidity(n) => summary.uid_validity = Some(n),
                    ResponseCode::ReadOnly => summary.read_only = true,
                    _ => {}
                },
                _ => {}
            }
            summary
        })
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
    use crate::Error;
    use crate::types::MailboxAttribute;
    use tokio_test::io::Builder;

    async fn logged_in(mock: tokio_test::io::Mock) -> Client<tokio_test::io::Mock, Authenticated> {
        let client = Client::from_stream(mock).await.unwrap();
        match client.login("anna", "secret").await.unwrap() {
            Transition::Accepted(client) => client,
            Transition::Refused { error, .. } => panic!("login refused: {error}"),
        }
    }

    fn script() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN anna secret\r\n")
            .read(b"A0001 OK Logged in\r\n");
        builder
    }

    #[test]
    fn test_summarize_examine() {
        let responses: Vec<Vec<u8>> = [
            &b"* FLAGS (\\Answered \\Seen)\r\n"[..],
            b"* 172 EXISTS\r\n",
            b"* 1 RECENT\r\n",
            b"* OK [UNSEEN 12] Message 12 is first unseen\r\n",
            b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n",
            b"* OK [UIDNEXT 4392] Predicted next UID\r\n",
            b"A0002 OK [READ-ONLY] EXAMINE completed\r\n",
        ]
        .iter()
        .map(|l| l.to_vec())
        .collect();

        assert_eq!(
            summarize_examine(&responses),
            ExamineSummary {
                exists: 172,
                uid_validity: Some(3857529045),
                read_only: true,
            }
        );
    }

    #[tokio::test]
    async fn test_examine_accepted() {
        let mock = script()
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n")
            .build();
        let client = logged_in(mock).await;

        let Transition::Accepted(selected) = client
            .examine(MailboxArg::Quoted("INBOX".to_string()))
            .await
            .unwrap()
        else {
            panic!("examine refused");
        };
        assert_eq!(selected.folder(), "INBOX");
        assert_eq!(selected.summary().exists, 3);
    }

    #[tokio::test]
    async fn test_examine_refused_then_raw_accepted() {
        let mock = script()
            .write(b"A0002 EXAMINE \"INBOX.Sent\"\r\n")
            .read(b"A0002 NO Mailbox doesn't exist\r\n")
            .write(b"A0003 EXAMINE INBOX.Sent\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"A0003 OK done\r\n")
            .build();
        let client = logged_in(mock).await;

        let Transition::Refused { client, error } = client
            .examine(MailboxArg::Quoted("INBOX.Sent".to_string()))
            .await
            .unwrap()
        else {
            panic!("quoted form accepted");
        };
        assert!(matches!(error, Error::No(_)));

        let Transition::Accepted(selected) = client
            .examine(MailboxArg::Raw("INBOX.Sent".to_string()))
            .await
            .unwrap()
        else {
            panic!("raw form refused");
        };
        assert_eq!(selected.folder(), "INBOX.Sent");
    }

    #[tokio::test]
    async fn test_list() {
        let mock = script()
            .write(b"A0002 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\Noselect \\HasChildren) \"/\" \"[Gmail]\"\r\n")
            .read(b"* LIST (\\HasNoChildren \\Sent) \"/\" \"[Gmail]/Sent Mail\"\r\n")
            .read(b"A0002 OK LIST completed\r\n")
            .build();
        let mut client = logged_in(mock).await;

        let mailboxes = client.list("", "*").await.unwrap();
        assert_eq!(mailboxes.len(), 3);
        assert_eq!(mailboxes[0].name(), "INBOX");
        assert!(mailboxes[1].attributes.contains(&MailboxAttribute::NoSelect));
        assert_eq!(mailboxes[2].name(), "[Gmail]/Sent Mail");
    }
}

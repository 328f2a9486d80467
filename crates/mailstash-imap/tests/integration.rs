//! End-to-end tests for the IMAP client against an in-memory server script.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use proptest::prelude::*;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailstash_imap::{
    Client, Error, MailboxArg, Response, ResponseParser, SeqNum, Transition, UntaggedResponse,
};

/// Stream that replays a canned server transcript and records what the
/// client sends.
struct ScriptedStream {
    replies: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    fn new(replies: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                replies: Cursor::new(replies.to_vec()),
                sent: Arc::clone(&sent),
            },
            sent,
        )
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.replies.position()).unwrap();
        let data = self.replies.get_ref();
        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }
        let to_read = (data.len() - pos).min(buf.remaining());
        buf.put_slice(&data[pos..pos + to_read]);
        self.replies.set_position((pos + to_read) as u64);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_full_archive_session() {
    let replies = concat!(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        "A0001 OK Logged in\r\n",
        "* LIST (\\HasNoChildren) \"/\" INBOX\r\n",
        "* LIST (\\Noselect) \"/\" Shared\r\n",
        "A0002 OK LIST done\r\n",
        "* 2 EXISTS\r\n",
        "A0003 OK [READ-ONLY] EXAMINE done\r\n",
        "* SEARCH 1 2\r\n",
        "A0004 OK SEARCH done\r\n",
        "* 1 FETCH (RFC822 {19}\r\nSubject: one\r\n\r\nA\r\n)\r\n",
        "A0005 OK FETCH done\r\n",
        "* 2 FETCH (RFC822 \"Subject: two\")\r\n",
        "A0006 OK FETCH done\r\n",
        "* BYE see you\r\n",
        "A0007 OK LOGOUT done\r\n",
    );
    let (stream, sent) = ScriptedStream::new(replies.as_bytes());

    let client = Client::from_stream(stream).await.unwrap();
    let Transition::Accepted(mut client) = client.login("anna@example.com", "pw").await.unwrap()
    else {
        panic!("login refused");
    };

    let folders = client.list("", "*").await.unwrap();
    let selectable: Vec<&str> = folders
        .iter()
        .filter(|f| f.is_selectable())
        .map(mailstash_imap::ListResponse::name)
        .collect();
    assert_eq!(selectable, vec!["INBOX"]);

    let Transition::Accepted(mut inbox) = client
        .examine(MailboxArg::Quoted("INBOX".to_string()))
        .await
        .unwrap()
    else {
        panic!("examine refused");
    };
    assert!(inbox.summary().read_only);

    let ids = inbox.search_all().await.unwrap();
    assert_eq!(ids.len(), 2);

    let first = inbox.fetch_rfc822(ids[0]).await.unwrap();
    assert_eq!(first, b"Subject: one\r\n\r\nA\r\n");
    let second = inbox.fetch_rfc822(ids[1]).await.unwrap();
    assert_eq!(second, b"Subject: two");

    inbox.logout().await;

    assert_eq!(
        sent_text(&sent),
        concat!(
            "A0001 LOGIN anna@example.com pw\r\n",
            "A0002 LIST \"\" \"*\"\r\n",
            "A0003 EXAMINE \"INBOX\"\r\n",
            "A0004 SEARCH ALL\r\n",
            "A0005 FETCH 1 (RFC822)\r\n",
            "A0006 FETCH 2 (RFC822)\r\n",
            "A0007 LOGOUT\r\n",
        )
    );
}

#[tokio::test]
async fn test_bye_mid_session_is_transport_error() {
    let replies = concat!(
        "* OK ready\r\n",
        "A0001 OK Logged in\r\n",
        "* 1 EXISTS\r\n",
        "A0002 OK done\r\n",
        "* BYE server shutting down\r\n",
    );
    let (stream, _sent) = ScriptedStream::new(replies.as_bytes());

    let client = Client::from_stream(stream).await.unwrap();
    let Transition::Accepted(client) = client.login("anna", "pw").await.unwrap() else {
        panic!("login refused");
    };
    let examined = client.examine(MailboxArg::Raw("INBOX".into())).await.unwrap();
    let Transition::Accepted(mut inbox) = examined else {
        panic!("examine refused");
    };

    let err = inbox.fetch_rfc822(SeqNum::new(1).unwrap()).await.unwrap_err();
    assert!(matches!(err, Error::Bye(_)));
    assert!(err.is_transport());
}

proptest! {
    #[test]
    fn test_parser_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = ResponseParser::parse(&input);
    }

    #[test]
    fn test_search_numbers_round_trip(ids in proptest::collection::vec(1u32..100_000, 0..50)) {
        let mut line = String::from("* SEARCH");
        for id in &ids {
            line.push_str(&format!(" {id}"));
        }
        line.push_str("\r\n");

        let parsed = ResponseParser::parse(line.as_bytes()).unwrap();
        let Response::Untagged(UntaggedResponse::Search(found)) = parsed else {
            panic!("expected SEARCH");
        };
        let found: Vec<u32> = found.into_iter().map(SeqNum::get).collect();
        prop_assert_eq!(found, ids);
    }
}

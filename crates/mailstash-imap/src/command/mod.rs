//! Commands a read-only client sends, and their wire form.

mod serialize;
mod tag_generator;
mod types;

pub use serialize::Serialized;
pub use tag_generator::TagGenerator;
pub use types::MailboxArg;

use serialize::{write_astring, write_mailbox};

use crate::types::SeqNum;

/// A client command, minus its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Asks for the capability list again.
    Capability,
    /// Does nothing; used to probe a connection.
    Noop,
    /// Ends the session. The server answers `BYE` before the completion.
    Logout,
    /// Plaintext login. Either argument goes out as a literal when it
    /// contains 8-bit or control bytes.
    Login {
        /// Login name, usually the mail address.
        username: String,
        /// Password.
        password: String,
    },
    /// Opens a folder without touching `\Seen` or `\Recent`.
    Examine {
        /// Folder name in the chosen quoting.
        mailbox: MailboxArg,
    },
    /// Folder listing, `LIST reference pattern`.
    List {
        /// Usually empty.
        reference: String,
        /// `*` for the whole tree.
        pattern: String,
    },
    /// `SEARCH ALL`: every sequence number in the open folder.
    SearchAll,
    /// `FETCH n (RFC822)`: one complete message.
    FetchRfc822(SeqNum),
}

impl Command {
    /// Wire form with `tag` in front and CRLF at the end, split where a
    /// literal has to wait for the server's go-ahead.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Serialized {
        let mut buf = Serialized::new();
        buf.extend(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend(b"CAPABILITY"),
            Self::Noop => buf.extend(b"NOOP"),
            Self::Logout => buf.extend(b"LOGOUT"),

            Self::Login { username, password } => {
                buf.extend(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }

            Self::Examine { mailbox } => {
                buf.extend(b"EXAMINE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::List { reference, pattern } => {
                buf.extend(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
            }

            Self::SearchAll => buf.extend(b"SEARCH ALL"),
            Self::FetchRfc822(seq) => buf.extend(format!("FETCH {seq} (RFC822)").as_bytes()),
        }

        buf.extend(b"\r\n");
        buf
    }

    /// Keyword for log lines; never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::Examine { .. } => "EXAMINE",
            Self::List { .. } => "LIST",
            Self::SearchAll => "SEARCH",
            Self::FetchRfc822(_) => "FETCH",
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
    use crate::types::SeqNum;

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001").to_bytes()).unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(wire(&Command::Capability), "A0001 CAPABILITY\r\n");
        assert_eq!(wire(&Command::Noop), "A0001 NOOP\r\n");
        assert_eq!(wire(&Command::Logout), "A0001 LOGOUT\r\n");
    }

    #[test]
    fn test_login_atoms() {
        let cmd = Command::Login {
            username: "anna@example.com".to_string(),
            password: "s3cret".to_string(),
        };
        assert_eq!(wire(&cmd), "A0001 LOGIN anna@example.com s3cret\r\n");
        assert_eq!(cmd.serialize("A0001").chunks().len(), 1);
    }

    #[test]
    fn test_login_quotes_specials() {
        let cmd = Command::Login {
            username: "anna".to_string(),
            password: "pa ss\"word\\".to_string(),
        };
        assert_eq!(wire(&cmd), "A0001 LOGIN anna \"pa ss\\\"word\\\\\"\r\n");
    }

    #[test]
    fn test_login_uses_literal_for_8bit_password() {
        let cmd = Command::Login {
            username: "anna".to_string(),
            password: "grün".to_string(),
        };
        let serialized = cmd.serialize("A0001");
        let chunks = serialized.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], b"A0001 LOGIN anna {5}\r\n");
        assert_eq!(chunks[1], "grün\r\n".as_bytes());
    }

    #[test]
    fn test_examine_quoted_and_raw() {
        let quoted = Command::Examine {
            mailbox: MailboxArg::Quoted("INBOX".to_string()),
        };
        assert_eq!(wire(&quoted), "A0001 EXAMINE \"INBOX\"\r\n");

        let raw = Command::Examine {
            mailbox: MailboxArg::Raw("INBOX.Sent".to_string()),
        };
        assert_eq!(wire(&raw), "A0001 EXAMINE INBOX.Sent\r\n");
    }

    #[test]
    fn test_list_all() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(wire(&cmd), "A0001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn test_search_and_fetch() {
        assert_eq!(wire(&Command::SearchAll), "A0001 SEARCH ALL\r\n");
        let fetch = Command::FetchRfc822(SeqNum::new(42).unwrap());
        assert_eq!(wire(&fetch), "A0001 FETCH 42 (RFC822)\r\n");
        assert_eq!(fetch.name(), "FETCH");
    }
}

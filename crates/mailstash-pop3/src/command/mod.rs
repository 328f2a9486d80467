//! POP3 command builder.

use std::fmt;

/// POP3 command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// USER - Name the mailbox
    User {
        /// Mailbox name
        name: String,
    },
    /// PASS - Mailbox password
    Pass {
        /// Password
        password: String,
    },
    /// STAT - Drop listing
    Stat,
    /// LIST - Scan listing for every message
    List,
    /// RETR - Retrieve one message
    Retr {
        /// Message number from the scan listing
        id: String,
    },
    /// NOOP - No operation
    Noop,
    /// QUIT - Close the session
    Quit,
}

impl Command {
    /// Serializes the command to bytes, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::User { name } => {
                buf.extend_from_slice(b"USER ");
                buf.extend_from_slice(name.as_bytes());
            }
            Self::Pass { password } => {
                buf.extend_from_slice(b"PASS ");
                buf.extend_from_slice(password.as_bytes());
            }
            Self::Stat => buf.extend_from_slice(b"STAT"),
            Self::List => buf.extend_from_slice(b"LIST"),
            Self::Retr { id } => {
                buf.extend_from_slice(b"RETR ");
                buf.extend_from_slice(id.as_bytes());
            }
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Quit => buf.extend_from_slice(b"QUIT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::User { .. } => "USER",
            Self::Pass { .. } => "PASS",
            Self::Stat => "STAT",
            Self::List => "LIST",
            Self::Retr { .. } => "RETR",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }

    /// Returns true if the server answers with a multi-line response.
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        matches!(self, Self::List | Self::Retr { .. })
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass { .. } => f.write_str("Pass { password: <redacted> }"),
            Self::User { name } => f.debug_struct("User").field("name", name).finish(),
            Self::Retr { id } => f.debug_struct("Retr").field("id", id).finish(),
            other => f.write_str(other.name()),
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

    #[test]
    fn test_serialize_user_pass() {
        let user = Command::User {
            name: "anna@example.com".into(),
        };
        assert_eq!(user.serialize(), b"USER anna@example.com\r\n");

        let pass = Command::Pass {
            password: "s3cret".into(),
        };
        assert_eq!(pass.serialize(), b"PASS s3cret\r\n");
    }

    #[test]
    fn test_serialize_simple_commands() {
        assert_eq!(Command::Stat.serialize(), b"STAT\r\n");
        assert_eq!(Command::List.serialize(), b"LIST\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_serialize_retr() {
        let cmd = Command::Retr { id: "7".into() };
        assert_eq!(cmd.serialize(), b"RETR 7\r\n");
        assert!(cmd.is_multiline());
        assert!(!Command::Stat.is_multiline());
    }

    #[test]
    fn test_debug_redacts_password() {
        let pass = Command::Pass {
            password: "s3cret".into(),
        };
        let rendered = format!("{pass:?}");
        assert!(!rendered.contains("s3cret"));
        assert_eq!(format!("{:?}", Command::Quit), "QUIT");
    }
}

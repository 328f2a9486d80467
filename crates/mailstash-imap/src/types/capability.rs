//! Capabilities a server advertises in its greeting or after LOGIN.
//!
//! Only the ones that change how a read-only archiver talks to the server
//! get their own variant; everything else is kept verbatim.

use std::fmt;

/// One advertised capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1`.
    Imap4Rev1,
    /// `LOGINDISABLED`: the LOGIN command will be refused on this
    /// connection.
    LoginDisabled,
    /// `AUTH=<mechanism>`, mechanism name as advertised.
    Auth(String),
    /// Anything else.
    Other(String),
}

impl Capability {
    /// Reads one capability token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("IMAP4rev1") {
            return Self::Imap4Rev1;
        }
        if token.eq_ignore_ascii_case("LOGINDISABLED") {
            return Self::LoginDisabled;
        }
        match token.split_once('=') {
            Some((key, mechanism)) if key.eq_ignore_ascii_case("AUTH") => {
                Self::Auth(mechanism.to_string())
            }
            _ => Self::Other(token.to_string()),
        }
    }

    /// Splits a space-separated capability list.
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.split_ascii_whitespace().map(Self::parse).collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::LoginDisabled => f.write_str("LOGINDISABLED"),
            Self::Auth(mechanism) => write!(f, "AUTH={mechanism}"),
            Self::Other(token) => f.write_str(token),
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

    #[test]
    fn test_parse_known_tokens() {
        assert_eq!(Capability::parse("imap4REV1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("LoginDisabled"), Capability::LoginDisabled);
        assert_eq!(Capability::parse("auth=PLAIN"), Capability::Auth("PLAIN".to_string()));
    }

    #[test]
    fn test_unrecognised_kept_verbatim() {
        let cap = Capability::parse("X-GM-EXT-1");
        assert_eq!(cap, Capability::Other("X-GM-EXT-1".to_string()));
        assert_eq!(cap.to_string(), "X-GM-EXT-1");
    }

    #[test]
    fn test_parse_list() {
        let caps = Capability::parse_list("IMAP4rev1  IDLE AUTH=XOAUTH2");
        assert_eq!(
            caps,
            vec![
                Capability::Imap4Rev1,
                Capability::Other("IDLE".to_string()),
                Capability::Auth("XOAUTH2".to_string()),
            ]
        );
        assert_eq!(caps[2].to_string(), "AUTH=XOAUTH2");
    }
}

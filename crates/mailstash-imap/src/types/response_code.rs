//! Bracketed response codes such as `[READ-ONLY]`.

use super::Capability;

/// Response code from a status response.
///
/// Codes the client acts on are decoded; the rest are kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `CAPABILITY ...`, sent with the greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// `READ-ONLY`.
    ReadOnly,
    /// `READ-WRITE`.
    ReadWrite,
    /// `UIDVALIDITY n`.
    UidValidity(u32),
    /// `AUTHENTICATIONFAILED` (RFC 5530).
    AuthenticationFailed,
    /// `UNAVAILABLE` (RFC 5530).
    Unavailable,
    /// `NONEXISTENT` (RFC 5530).
    NonExistent,
    /// Any other code, name uppercased, arguments verbatim.
    Other {
        /// Code name.
        name: String,
        /// Everything between the name and `]`.
        args: String,
    },
}

impl ResponseCode {
    /// Decodes the text between `[` and `]`.
    #[must_use]
    pub fn parse(inner: &str) -> Self {
        let (name, args) = inner.trim().split_once(' ').unwrap_or((inner.trim(), ""));
        let name = name.to_ascii_uppercase();
        let args = args.trim();

        let known = match name.as_str() {
            "CAPABILITY" => Some(Self::Capability(Capability::parse_list(args))),
            "READ-ONLY" => Some(Self::ReadOnly),
            "READ-WRITE" => Some(Self::ReadWrite),
            "AUTHENTICATIONFAILED" => Some(Self::AuthenticationFailed),
            "UNAVAILABLE" => Some(Self::Unavailable),
            "NONEXISTENT" => Some(Self::NonExistent),
            "UIDVALIDITY" => args.parse().ok().map(Self::UidValidity),
            _ => None,
        };
        known.unwrap_or_else(|| Self::Other {
            name,
            args: args.to_string(),
        })
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
    fn test_decoded_codes() {
        assert_eq!(ResponseCode::parse("read-only"), ResponseCode::ReadOnly);
        assert_eq!(ResponseCode::parse("AUTHENTICATIONFAILED"), ResponseCode::AuthenticationFailed);
        assert_eq!(
            ResponseCode::parse("UIDVALIDITY 3857529045"),
            ResponseCode::UidValidity(3857529045)
        );
        assert_eq!(
            ResponseCode::parse("CAPABILITY IMAP4rev1 LOGINDISABLED"),
            ResponseCode::Capability(vec![Capability::Imap4Rev1, Capability::LoginDisabled])
        );
    }

    #[test]
    fn test_other_keeps_arguments() {
        assert_eq!(
            ResponseCode::parse("PERMANENTFLAGS (\\Seen \\*)"),
            ResponseCode::Other {
                name: "PERMANENTFLAGS".to_string(),
                args: "(\\Seen \\*)".to_string(),
            }
        );
        assert!(matches!(
            ResponseCode::parse("UIDVALIDITY soon"),
            ResponseCode::Other { ref name, .. } if name == "UIDVALIDITY"
        ));
    }
}

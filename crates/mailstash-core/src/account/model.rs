//! Account model types.

use serde::{Deserialize, Serialize};

/// Retrieval protocol of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// IMAP4rev1.
    Imap,
    /// POP3.
    Pop3,
}

impl Protocol {
    /// Parses a protocol name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IMAP" => Some(Self::Imap),
            "POP3" => Some(Self::Pop3),
            _ => None,
        }
    }

    /// Returns the protocol name as written in the accounts file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imap => "IMAP",
            Self::Pop3 => "POP3",
        }
    }

    /// Returns the folder used when the caller names none.
    #[must_use]
    pub const fn default_folder(self) -> &'static str {
        match self {
            Self::Imap => "INBOX",
            Self::Pop3 => "inbox",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing mail server of an account.
///
/// Stored and round-tripped, never used for retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundServer {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
}

/// Connection parameters of one mail account.
///
/// The password is not part of the profile; it is looked up by [`id`] in a
/// [`SecretStore`](super::SecretStore) when a session is opened.
///
/// [`id`]: AccountProfile::id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Mail address. Also the login name and the credential key.
    pub id: String,
    /// Display name, used for the archive directory.
    pub display_name: String,
    /// Incoming server hostname.
    pub inbound_host: String,
    /// Incoming server port.
    pub inbound_port: u16,
    /// Retrieval protocol.
    pub protocol: Protocol,
    /// Optional outgoing server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<OutboundServer>,
}

impl AccountProfile {
    /// Creates a profile without an outbound server.
    #[must_use]
    pub fn new(
        display_name: impl Into<String>,
        id: impl Into<String>,
        inbound_host: impl Into<String>,
        inbound_port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            inbound_host: inbound_host.into(),
            inbound_port,
            protocol,
            outbound: None,
        }
    }

    /// Sets the outbound server.
    #[must_use]
    pub fn with_outbound(mut self, host: impl Into<String>, port: u16) -> Self {
        self.outbound = Some(OutboundServer { host: host.into(), port });
        self
    }

    /// Returns the part of the id before `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.id.split('@').next().unwrap_or_default()
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

    mod protocol_tests {
        use super::*;

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!(Protocol::parse("imap"), Some(Protocol::Imap));
            assert_eq!(Protocol::parse(" Pop3 "), Some(Protocol::Pop3));
            assert_eq!(Protocol::parse("smtp"), None);
        }

        #[test]
        fn default_folders() {
            assert_eq!(Protocol::Imap.default_folder(), "INBOX");
            assert_eq!(Protocol::Pop3.default_folder(), "inbox");
        }

        #[test]
        fn display() {
            assert_eq!(Protocol::Pop3.to_string(), "POP3");
        }
    }

    mod profile_tests {
        use super::*;

        #[test]
        fn new_has_no_outbound() {
            let profile = AccountProfile::new(
                "Work",
                "anna@example.com",
                "imap.example.com",
                993,
                Protocol::Imap,
            );
            assert!(profile.outbound.is_none());
            assert_eq!(profile.local_part(), "anna");
        }

        #[test]
        fn with_outbound() {
            let profile = AccountProfile::new(
                "Work",
                "anna@example.com",
                "imap.example.com",
                993,
                Protocol::Imap,
            )
                .with_outbound("smtp.example.com", 465);
            assert_eq!(
                profile.outbound,
                Some(OutboundServer {
                    host: "smtp.example.com".to_string(),
                    port: 465
                })
            );
        }

        #[test]
        fn serde_skips_missing_outbound() {
            let profile = AccountProfile::new(
                "Home",
                "bob@example.org",
                "pop.example.org",
                995,
                Protocol::Pop3,
            );
            let json = serde_json::to_string(&profile).unwrap();
            assert!(!json.contains("outbound"));

            let back: AccountProfile = serde_json::from_str(&json).unwrap();
            assert_eq!(back, profile);
        }
    }
}

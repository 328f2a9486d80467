//! Folder listings and what EXAMINE tells us about a folder.

/// One `* LIST` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Name attributes such as `\Noselect`.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy separator, `None` for a flat namespace.
    pub delimiter: Option<char>,
    /// Folder name, decoded from quoted string or literal.
    pub name: String,
}

impl ListResponse {
    /// Folder name as the server spells it.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether EXAMINE can open this entry.
    ///
    /// `\Noselect` and `\NonExistent` mark hierarchy placeholders.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.iter().any(MailboxAttribute::blocks_examine)
    }
}

/// Name attribute from a LIST line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// `\Noselect`.
    NoSelect,
    /// `\NonExistent` (RFC 5258).
    NonExistent,
    /// Any other attribute, kept with its backslash.
    Other(String),
}

impl MailboxAttribute {
    /// Reads one attribute, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("\\Noselect") {
            Self::NoSelect
        } else if raw.eq_ignore_ascii_case("\\NonExistent") {
            Self::NonExistent
        } else {
            Self::Other(raw.to_string())
        }
    }

    const fn blocks_examine(&self) -> bool {
        matches!(self, Self::NoSelect | Self::NonExistent)
    }
}

/// Facts gathered from the untagged data of an EXAMINE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExamineSummary {
    /// `* n EXISTS`.
    pub exists: u32,
    /// `[UIDVALIDITY n]`, if the server sent one.
    pub uid_validity: Option<u32>,
    /// Set by a `[READ-ONLY]` code.
    pub read_only: bool,
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

    fn entry(attributes: &[&str]) -> ListResponse {
        ListResponse {
            attributes: attributes.iter().map(|a| MailboxAttribute::parse(a)).collect(),
            delimiter: Some('.'),
            name: "INBOX.Projekte".to_string(),
        }
    }

    #[test]
    fn test_attribute_case_insensitive() {
        assert_eq!(MailboxAttribute::parse("\\NOSELECT"), MailboxAttribute::NoSelect);
        assert_eq!(MailboxAttribute::parse("\\nonexistent"), MailboxAttribute::NonExistent);
        assert_eq!(
            MailboxAttribute::parse("\\Junk"),
            MailboxAttribute::Other("\\Junk".to_string())
        );
    }

    #[test]
    fn test_placeholders_not_selectable() {
        assert!(entry(&[]).is_selectable());
        assert!(entry(&["\\HasChildren", "\\Archive"]).is_selectable());
        assert!(!entry(&["\\HasChildren", "\\Noselect"]).is_selectable());
        assert!(!entry(&["\\NonExistent"]).is_selectable());
        assert_eq!(entry(&[]).name(), "INBOX.Projekte");
    }
}

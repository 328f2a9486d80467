//! `Content-Disposition` header (RFC 2183).

use crate::params::{Parameters, split_unquoted};

/// Disposition type of a body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed as part of the message.
    Inline,
    /// Separate from the message body.
    Attachment,
    /// Any other token.
    Other(String),
}

/// Parsed `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Disposition parameters.
    pub parameters: Parameters,
}

impl ContentDisposition {
    /// Parses a disposition value such as `attachment; filename="a.pdf"`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let pieces = split_unquoted(s, ';');
        let token = pieces.first().map_or("", |p| p.trim()).to_ascii_lowercase();
        let kind = match token.as_str() {
            "inline" => DispositionKind::Inline,
            "attachment" => DispositionKind::Attachment,
            _ => DispositionKind::Other(token),
        };
        let params = s.find(';').map_or("", |idx| &s[idx + 1..]);

        Self {
            kind,
            parameters: Parameters::parse(params),
        }
    }

    /// Returns true for `attachment`.
    #[must_use]
    pub const fn is_attachment(&self) -> bool {
        matches!(self.kind, DispositionKind::Attachment)
    }

    /// Returns true for `inline`.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self.kind, DispositionKind::Inline)
    }

    /// Returns the `filename` parameter, RFC 2231 forms included.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters.get("filename")
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
    fn test_attachment_with_filename() {
        let cd = ContentDisposition::parse("Attachment; filename=\"report.pdf\"");
        assert!(cd.is_attachment());
        assert!(!cd.is_inline());
        assert_eq!(cd.filename().as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_inline_without_params() {
        let cd = ContentDisposition::parse("inline");
        assert!(cd.is_inline());
        assert_eq!(cd.filename(), None);
    }

    #[test]
    fn test_other_kind() {
        let cd = ContentDisposition::parse("form-data; name=field");
        assert_eq!(cd.kind, DispositionKind::Other("form-data".to_string()));
    }

    #[test]
    fn test_extended_filename() {
        let cd = ContentDisposition::parse("attachment; filename*=UTF-8''Rechnung%20M%C3%A4rz.pdf");
        assert_eq!(cd.filename().as_deref(), Some("Rechnung März.pdf"));
    }
}

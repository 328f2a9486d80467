//! `Content-Type` values.

use std::fmt;

use crate::error::{Error, Result};
use crate::params::{Parameters, split_unquoted};

/// A parsed `Content-Type`: lowercased `type/subtype` plus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Top-level media type, lowercase.
    pub kind: String,
    /// Subtype, lowercase.
    pub subtype: String,
    /// Everything after the first unquoted `;`.
    pub params: Parameters,
}

impl ContentType {
    /// What a part without a usable header is (RFC 2045 §5.2).
    #[must_use]
    pub fn rfc2045_default() -> Self {
        let mut params = Parameters::default();
        params.insert("charset", "us-ascii");
        Self {
            kind: "text".to_string(),
            subtype: "plain".to_string(),
            params,
        }
    }

    /// Reads a header value such as `text/plain; charset="utf-8"`.
    ///
    /// # Errors
    ///
    /// [`Error::ContentType`] when either half of `type/subtype` is absent.
    pub fn parse(value: &str) -> Result<Self> {
        let mut pieces = split_unquoted(value, ';').into_iter();
        let essence = pieces.next().unwrap_or_default().trim();

        let Some((kind, subtype)) = essence.split_once('/') else {
            return Err(Error::ContentType(format!("no subtype in {essence:?}")));
        };
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return Err(Error::ContentType(format!("empty type or subtype in {essence:?}")));
        }

        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Parameters::parse(value.split_once(';').map_or("", |(_, rest)| rest)),
        })
    }

    /// Decoded parameter, RFC 2231 continuations joined.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<String> {
        self.params.get(name)
    }

    /// `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        self.param("charset")
    }

    /// `boundary` parameter of a multipart type.
    #[must_use]
    pub fn boundary(&self) -> Option<String> {
        self.param("boundary")
    }

    /// `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.kind == "multipart"
    }

    /// `text/*`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    /// Case-insensitive `type/subtype` comparison.
    #[must_use]
    pub fn is(&self, kind: &str, subtype: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind) && self.subtype.eq_ignore_ascii_case(subtype)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
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
    fn test_default_is_ascii_text() {
        let ct = ContentType::rfc2045_default();
        assert!(ct.is("TEXT", "Plain"));
        assert_eq!(ct.charset().as_deref(), Some("us-ascii"));
    }

    #[test]
    fn test_lowercases_essence_only() {
        let ct = ContentType::parse("Application/PDF; Name=\"Q3 Report.pdf\"").unwrap();
        assert_eq!(ct.to_string(), "application/pdf");
        assert_eq!(ct.param("name").as_deref(), Some("Q3 Report.pdf"));
        assert!(!ct.is_text());
    }

    #[test]
    fn test_semicolon_inside_quoted_boundary() {
        let ct =
            ContentType::parse("multipart/alternative; boundary=\"a;b=c\"; charset=utf-8").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary().as_deref(), Some("a;b=c"));
        assert_eq!(ct.charset().as_deref(), Some("utf-8"));
    }

    #[test]
    fn test_rejects_incomplete() {
        for bad in ["", "text", "text/", "/html", " ; charset=utf-8"] {
            assert!(ContentType::parse(bad).is_err(), "{bad:?}");
        }
    }
}

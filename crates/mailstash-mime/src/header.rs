//! Header block of a message or body part.

use crate::encoding::decode_rfc2047;

#[derive(Debug, Clone)]
struct Field {
    name: String,
    value: String,
}

/// Header fields of one entity, unfolded, in the order they appeared.
///
/// Lookups ignore ASCII case. Repeated fields are all kept; lookups return
/// the first.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<Field>,
}

impl Headers {
    /// Reads the header block at the start of `text`.
    ///
    /// Stops at the first blank line. Lines starting with a space or tab
    /// continue the previous field and are joined to it with a single space.
    /// Lines with no colon are dropped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut fields: Vec<Field> = Vec::new();
        let mut open = false;

        for line in text.lines().take_while(|line| !line.is_empty()) {
            if line.starts_with([' ', '\t']) {
                if let Some(last) = fields.last_mut().filter(|_| open) {
                    last.value.push(' ');
                    last.value.push_str(line.trim());
                }
                continue;
            }
            open = match line.split_once(':') {
                Some((name, value)) => {
                    fields.push(Field {
                        name: name.trim().to_string(),
                        value: value.trim().to_string(),
                    });
                    true
                }
                None => false,
            };
        }

        Self { fields }
    }

    /// Like [`Self::parse`] for raw bytes. Anything that is not UTF-8 is read
    /// as ISO-8859-1, so this cannot fail.
    #[must_use]
    pub fn parse_bytes(raw: &[u8]) -> Self {
        if let Ok(text) = std::str::from_utf8(raw) {
            return Self::parse(text);
        }
        let latin1: String = raw.iter().copied().map(char::from).collect();
        Self::parse(&latin1)
    }

    /// Value of the first field called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// [`Self::get`] with RFC 2047 encoded words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_rfc2047)
    }

    /// Field names in header order, repeats included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
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
    fn test_parse_unfolds_and_stops_at_body() {
        let headers = Headers::parse(concat!(
            "Return-Path: <bounce@lists.example.org>\r\n",
            "Subject: quarterly\r\n",
            "  numbers\r\n",
            "Content-Type: multipart/mixed;\r\n",
            "\tboundary=\"b1\"\r\n",
            "\r\n",
            "X-In-Body: yes\r\n"
        ));
        assert_eq!(headers.get("SUBJECT"), Some("quarterly numbers"));
        assert_eq!(headers.get("content-type"), Some("multipart/mixed; boundary=\"b1\""));
        assert_eq!(headers.get("x-in-body"), None);
    }

    #[test]
    fn test_repeated_fields_first_wins() {
        let headers = Headers::parse("Received: hop 2\nReceived: hop 1\nDate: today\n");
        assert_eq!(headers.get("received"), Some("hop 2"));
        assert_eq!(headers.names().collect::<Vec<_>>(), vec!["Received", "Received", "Date"]);
    }

    #[test]
    fn test_continuation_after_garbage_is_dropped() {
        let headers =
            Headers::parse("From: a@example.com\nnot a header\n  stray\nTo: b@example.com\n");
        assert_eq!(headers.get("from"), Some("a@example.com"));
        assert_eq!(headers.get("to"), Some("b@example.com"));
        assert_eq!(headers.names().count(), 2);
    }

    #[test]
    fn test_get_decoded() {
        let headers = Headers::parse("Subject: =?utf-8?Q?Gr=C3=BC=C3=9Fe?=\r\n\r\n");
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("Grüße"));
        assert_eq!(headers.get_decoded("from"), None);
    }

    #[test]
    fn test_parse_bytes_latin1_fallback() {
        let headers = Headers::parse_bytes(b"Subject: caf\xe9\r\n\r\n");
        assert_eq!(headers.get("subject"), Some("café"));
    }
}

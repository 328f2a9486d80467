//! Command serialization helpers.

use super::types::MailboxArg;

/// A serialized command, split where the server must acknowledge a literal.
///
/// Every chunk except the last ends with `{n}\r\n` and may only be followed
/// by the next chunk once the server sent a `+` continuation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Serialized {
    chunks: Vec<Vec<u8>>,
}

impl Serialized {
    pub(crate) fn new() -> Self {
        Self { chunks: vec![Vec::new()] }
    }

    pub(crate) fn current(&mut self) -> &mut Vec<u8> {
        if self.chunks.is_empty() {
            self.chunks.push(Vec::new());
        }
        let last = self.chunks.len() - 1;
        &mut self.chunks[last]
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.current().extend_from_slice(bytes);
    }

    pub(crate) fn push(&mut self, byte: u8) {
        self.current().push(byte);
    }

    /// Writes a synchronizing literal and starts a new chunk for its payload.
    pub(crate) fn literal(&mut self, bytes: &[u8]) {
        self.extend(format!("{{{}}}\r\n", bytes.len()).as_bytes());
        self.chunks.push(bytes.to_vec());
    }

    /// Returns the chunks in send order.
    #[must_use]
    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Concatenates all chunks, as they appear on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Writes an astring: a bare atom, a quoted string, or a literal.
///
/// Literals are used for 8-bit data and line breaks, which quoted strings
/// cannot carry.
pub fn write_astring(buf: &mut Serialized, s: &str) {
    if s.bytes().any(needs_literal) {
        buf.literal(s.as_bytes());
    } else if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.extend(s.as_bytes());
    }
}

/// Writes a quoted string, escaping `"` and `\`.
pub fn write_quoted(buf: &mut Serialized, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Writes a mailbox argument in the requested wire form.
pub fn write_mailbox(buf: &mut Serialized, mailbox: &MailboxArg) {
    match mailbox {
        MailboxArg::Quoted(name) => write_quoted(buf, name),
        MailboxArg::Raw(name) => buf.extend(name.as_bytes()),
    }
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b == 0x7F
}

/// Returns true if the byte cannot appear in a quoted string.
const fn needs_literal(b: u8) -> bool {
    b == b'\r' || b == b'\n' || b == 0 || b >= 0x80
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

    fn astring(s: &str) -> Serialized {
        let mut buf = Serialized::new();
        write_astring(&mut buf, s);
        buf
    }

    #[test]
    fn test_astring_forms() {
        assert_eq!(astring("anna").to_bytes(), b"anna");
        assert_eq!(astring("two words").to_bytes(), b"\"two words\"");
        assert_eq!(astring("").to_bytes(), b"\"\"");
        assert_eq!(astring("a\"b\\c").to_bytes(), b"\"a\\\"b\\\\c\"");
    }

    #[test]
    fn test_literal_splits_chunks() {
        let buf = astring("grün");
        assert_eq!(buf.chunks().len(), 2);
        assert_eq!(buf.chunks()[0], b"{5}\r\n");
        assert_eq!(buf.chunks()[1], "grün".as_bytes());
    }

    #[test]
    fn test_mailbox_raw_is_untouched() {
        let mut buf = Serialized::new();
        write_mailbox(&mut buf, &MailboxArg::Raw("INBOX.Sent Items".to_string()));
        assert_eq!(buf.to_bytes(), b"INBOX.Sent Items");
    }
}

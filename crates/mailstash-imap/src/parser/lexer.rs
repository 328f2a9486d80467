//! Byte-level tokens of one server response.
//!
//! Input is a whole response from
//! [`FramedStream::read_response`](crate::FramedStream::read_response);
//! literal payloads are therefore already in the buffer and are handed out
//! as borrowed slices.

#![allow(clippy::missing_errors_doc)]

use std::borrow::Cow;

use crate::{Error, Result};

/// One lexical unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare word; `\Flags` included.
    Atom(&'a str),
    /// `"..."` with escapes resolved, lossily decoded.
    Quoted(Cow<'a, str>),
    /// Payload of a `{n}` literal.
    Literal(&'a [u8]),
    /// All-digit atom that fits in a `u32`.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// ` `
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `NIL` in any case.
    Nil,
    /// CRLF, or a lone LF.
    Crlf,
    /// Nothing left.
    Eof,
}

/// Cursor over one response.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Starts at the first byte.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset of the cursor.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Input after the cursor.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Byte under the cursor.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes one token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.input.get(self.pos + 1) == Some(&b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'\n' => {
                // Bare LF from sloppy servers.
                self.pos += 1;
                Ok(Token::Crlf)
            }
            b'"' => self.read_quoted(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => Ok(self.read_atom()),
            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    /// Any escaped byte stands for itself, not only `\"` and `\\`.
    fn read_quoted(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        let mut unescaped: Option<Vec<u8>> = None;

        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("Unexpected end of quoted string"))?;
                    let buf =
                        unescaped.get_or_insert_with(|| self.input[start..self.pos - 2].to_vec());
                    buf.push(escaped);
                }
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("Unterminated quoted string"));
                }
                Some(b) => {
                    if let Some(buf) = unescaped.as_mut() {
                        buf.push(b);
                    }
                }
            }
        }

        let text = match unescaped {
            Some(buf) => Cow::Owned(String::from_utf8_lossy(&buf).into_owned()),
            None => String::from_utf8_lossy(&self.input[start..self.pos - 1]),
        };
        Ok(Token::Quoted(text))
    }

    /// `{n}` or `{n+}`, CRLF, then n bytes.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if self.bump() != Some(b'}') {
            return Err(self.error("Malformed literal size"));
        }
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| self.error("Invalid literal size"))?;

        if self.bump() != Some(b'\r') || self.bump() != Some(b'\n') {
            return Err(self.error("Expected CRLF after literal size"));
        }
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("Incomplete literal data"))?;

        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    /// Atom, unless it is all digits or spells NIL.
    fn read_atom(&mut self) -> Token<'a> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];

        // ASCII only.
        let s = std::str::from_utf8(raw).unwrap_or_default();
        if raw.iter().all(u8::is_ascii_digit)
            && let Ok(n) = s.parse()
        {
            return Token::Number(n);
        }
        if s.eq_ignore_ascii_case("NIL") {
            return Token::Nil;
        }
        Token::Atom(s)
    }

    /// [`Error::Parse`] at the cursor.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Requires a single space.
    pub fn expect_space(&mut self) -> Result<()> {
        match self.next_token()? {
            Token::Space => Ok(()),
            token => Err(self.error(&format!("Expected space, got {token:?}"))),
        }
    }

    /// Requires a token of the same kind as `expected`.
    pub fn expect(&mut self, expected: &Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    /// Any string-like token as owned text; NIL reads as `"NIL"`.
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::Quoted(s) => Ok(s.into_owned()),
            Token::Literal(data) => Ok(String::from_utf8_lossy(data).into_owned()),
            Token::Nil => Ok("NIL".to_string()),
            token => Err(self.error(&format!("Expected astring, got {token:?}"))),
        }
    }

    /// Requires a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("Expected number, got {token:?}"))),
        }
    }

    /// Requires an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("Expected atom, got {token:?}"))),
        }
    }

    /// Everything up to the line ending, which stays unread.
    pub fn read_text(&mut self) -> String {
        let rest = self.remaining();
        let end = rest.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(rest.len());
        self.pos += end;
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }

    /// Bytes before `stop`; the cursor ends just past it.
    pub fn take_until(&mut self, stop: u8) -> Result<&'a [u8]> {
        let rest = self.remaining();
        let end = rest
            .iter()
            .position(|&b| b == stop)
            .ok_or_else(|| self.error(&format!("Missing {:?}", char::from(stop))))?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    /// Skips any run of spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }
}

/// Atom bytes: visible ASCII minus the specials. Backslash counts, so
/// `\Seen` is one atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b, 0x21..=0x7E) && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b']' | b'[')
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

    fn tokens(input: &[u8]) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn test_tagged_line() {
        assert_eq!(
            tokens(b"A0001 OK done\r\n"),
            vec![
                Token::Atom("A0001"),
                Token::Space,
                Token::Atom("OK"),
                Token::Space,
                Token::Atom("done"),
                Token::Crlf,
            ]
        );
    }

    #[test]
    fn test_numbers_and_nil() {
        assert_eq!(
            tokens(b"* 12 nil"),
            vec![
                Token::Asterisk,
                Token::Space,
                Token::Number(12),
                Token::Space,
                Token::Nil
            ]
        );
    }

    #[test]
    fn test_number_overflow_is_atom() {
        assert_eq!(tokens(b"99999999999"), vec![Token::Atom("99999999999")]);
    }

    #[test]
    fn test_quoted_borrowed_and_escaped() {
        assert_eq!(tokens(b"\"plain\""), vec![Token::Quoted(Cow::Borrowed("plain"))]);
        assert_eq!(
            tokens(b"\"a \\\"b\\\" \\\\c\""),
            vec![Token::Quoted(Cow::Owned("a \"b\" \\c".to_string()))]
        );
    }

    #[test]
    fn test_quoted_invalid_utf8_is_lossy() {
        match &tokens(b"\"caf\xe9\"")[0] {
            Token::Quoted(s) => assert_eq!(s, "caf\u{fffd}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_quoted() {
        let mut lexer = Lexer::new(b"\"open\r\n");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_literal() {
        assert_eq!(
            tokens(b"{5}\r\nhello)"),
            vec![Token::Literal(b"hello"), Token::RParen]
        );
        assert_eq!(tokens(b"{2+}\r\nhi"), vec![Token::Literal(b"hi")]);
    }

    #[test]
    fn test_literal_incomplete() {
        let mut lexer = Lexer::new(b"{10}\r\nshort");
        assert!(matches!(lexer.next_token(), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_flags_and_brackets() {
        assert_eq!(
            tokens(b"[READ-ONLY] (\\Seen)"),
            vec![
                Token::LBracket,
                Token::Atom("READ-ONLY"),
                Token::RBracket,
                Token::Space,
                Token::LParen,
                Token::Atom("\\Seen"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_read_text() {
        let mut lexer = Lexer::new(b"some text here\r\n");
        assert_eq!(lexer.read_text(), "some text here");
        assert_eq!(lexer.next_token().unwrap(), Token::Crlf);
    }

    #[test]
    fn test_is_atom_char() {
        assert!(is_atom_char(b'A'));
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'.'));
        assert!(!is_atom_char(b' '));
        assert!(!is_atom_char(b'('));
        assert!(!is_atom_char(b'{'));
        assert!(!is_atom_char(b'['));
    }
}

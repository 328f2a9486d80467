//! FETCH response parsing.

use crate::Result;

use super::lexer::{Lexer, Token};
use super::response::parse_flag_list;

/// One item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `RFC822`, `BODY[]` or another body section.
    Body {
        /// Section specifier; `None` for `RFC822`.
        section: Option<String>,
        /// Payload; `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
    /// `RFC822.SIZE`.
    Rfc822Size(u32),
    /// `UID`.
    Uid(u32),
    /// `FLAGS`.
    Flags(Vec<String>),
    /// `INTERNALDATE`, unparsed.
    InternalDate(String),
}

/// Parses the parenthesised item list of a FETCH response.
///
/// Items this client does not request are skipped.
pub(super) fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(&Token::LParen)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => return Ok(items),
            Token::Space => continue,
            Token::Atom(name) => name.to_uppercase(),
            token => return Err(lexer.error(&format!("Expected FETCH item name, got {token:?}"))),
        };

        match name.as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                items.push(FetchItem::Uid(lexer.read_number()?));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                items.push(FetchItem::InternalDate(lexer.read_astring()?));
            }
            "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                let section = (name != "RFC822").then(|| name[7..].to_string());
                lexer.expect_space()?;
                let data = read_body_data(lexer)?;
                items.push(FetchItem::Body { section, data });
            }
            "BODY" | "BINARY" if lexer.peek() == Some(b'[') => {
                lexer.expect(&Token::LBracket)?;
                let section = String::from_utf8_lossy(lexer.take_until(b']')?).into_owned();
                skip_origin(lexer);
                lexer.expect_space()?;
                let data = read_body_data(lexer)?;
                items.push(FetchItem::Body {
                    section: Some(section),
                    data,
                });
            }
            _ => {
                lexer.expect_space()?;
                skip_value(lexer)?;
            }
        }
    }
}

/// Reads a body payload: literal, quoted string or NIL.
fn read_body_data(lexer: &mut Lexer<'_>) -> Result<Option<Vec<u8>>> {
    match lexer.next_token()? {
        Token::Literal(data) => Ok(Some(data.to_vec())),
        Token::Quoted(text) => Ok(Some(text.into_owned().into_bytes())),
        Token::Nil => Ok(None),
        token => Err(lexer.error(&format!("Expected message data, got {token:?}"))),
    }
}

/// Skips a partial-fetch origin such as `<0>`.
fn skip_origin(lexer: &mut Lexer<'_>) {
    if lexer.peek() == Some(b'<') {
        let _ = lexer.take_until(b'>');
    }
}

/// Skips one value: a single token or a balanced parenthesised list.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => depth -= 1,
            Token::Eof | Token::Crlf | Token::RParen => {
                return Err(lexer.error("Unexpected end of FETCH item"));
            }
            _ => {}
        }
        if depth == 0 {
            return Ok(());
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
    use crate::parser::{Response, ResponseParser, UntaggedResponse};

    use super::*;

    fn fetch_items(input: &[u8]) -> Vec<FetchItem> {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(UntaggedResponse::Fetch { items, .. }) => items,
            other => panic!("expected FETCH, got {other:?}"),
        }
    }

    #[test]
    fn test_rfc822_literal() {
        let items = fetch_items(b"* 42 FETCH (RFC822 {11}\r\nSubject: x\n)\r\n");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: None,
                data: Some(b"Subject: x\n".to_vec())
            }]
        );
    }

    #[test]
    fn test_rfc822_quoted() {
        let items = fetch_items(b"* 1 FETCH (RFC822 \"Subject: hi\")\r\n");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: None,
                data: Some(b"Subject: hi".to_vec())
            }]
        );
    }

    #[test]
    fn test_body_section_with_origin() {
        let items = fetch_items(b"* 3 FETCH (UID 99 BODY[]<0> {3}\r\nabc FLAGS (\\Seen))\r\n");
        assert_eq!(
            items,
            vec![
                FetchItem::Uid(99),
                FetchItem::Body {
                    section: Some(String::new()),
                    data: Some(b"abc".to_vec())
                },
                FetchItem::Flags(vec!["\\Seen".to_string()]),
            ]
        );
    }

    #[test]
    fn test_nil_body() {
        let items = fetch_items(b"* 5 FETCH (RFC822 NIL)\r\n");
        assert_eq!(items, vec![FetchItem::Body { section: None, data: None }]);
    }

    #[test]
    fn test_unknown_items_skipped() {
        let items = fetch_items(
            b"* 7 FETCH (MODSEQ (12345) ENVELOPE (NIL \"subj\" ((NIL NIL \"a\" \"b.c\")) NIL) \
               RFC822.SIZE 2048)\r\n",
        );
        assert_eq!(items, vec![FetchItem::Rfc822Size(2048)]);
    }

    #[test]
    fn test_seq_num_zero_rejected() {
        assert!(ResponseParser::parse(b"* 0 FETCH (UID 1)\r\n").is_err());
    }
}

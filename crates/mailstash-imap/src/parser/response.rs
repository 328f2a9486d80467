//! Response structure and the top-level parser.

#![allow(clippy::missing_errors_doc)]

use crate::types::{Capability, ListResponse, MailboxAttribute, ResponseCode, SeqNum, Status};
use crate::{Error, Result};

use super::fetch::{FetchItem, parse_fetch_items};
use super::lexer::{Lexer, Token};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of a command.
    Tagged {
        /// The command's tag.
        tag: String,
        /// OK, NO or BAD.
        status: Status,
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged data (`* ...`).
    Untagged(UntaggedResponse),
    /// Command continuation request (`+ ...`).
    Continuation {
        /// Text after the `+`.
        text: String,
    },
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// OK, NO, BAD, PREAUTH or BYE.
    Status {
        /// Which status.
        status: Status,
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY data.
    Capability(Vec<Capability>),
    /// One LIST line.
    List(ListResponse),
    /// SEARCH results in server order.
    Search(Vec<SeqNum>),
    /// FLAGS of the mailbox.
    Flags(Vec<String>),
    /// Message count.
    Exists(u32),
    /// Recent count.
    Recent(u32),
    /// A message was expunged.
    Expunge(u32),
    /// FETCH data for one message.
    Fetch {
        /// Sequence number of the message.
        seq: SeqNum,
        /// Items the server returned.
        items: Vec<FetchItem>,
    },
    /// Anything this client does not interpret.
    Other(String),
}

/// Parser entry point.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Plus => {
                lexer.skip_spaces();
                Ok(Response::Continuation {
                    text: lexer.read_text(),
                })
            }
            Token::Asterisk => {
                lexer.expect_space()?;
                parse_untagged(&mut lexer).map(Response::Untagged)
            }
            Token::Atom(tag) => {
                lexer.expect_space()?;
                let status = parse_status(&mut lexer)?;
                let (code, text) = parse_resp_text(&mut lexer)?;
                Ok(Response::Tagged {
                    tag: tag.to_string(),
                    status,
                    code,
                    text,
                })
            }
            token => Err(lexer.error(&format!("Unexpected start of response: {token:?}"))),
        }
    }
}

fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
    let atom = lexer.read_atom_string()?;
    Status::from_word(atom).ok_or_else(|| lexer.error(&format!("Unknown status {atom:?}")))
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
    match lexer.next_token()? {
        Token::Number(n) => {
            lexer.expect_space()?;
            let kind = lexer.read_atom_string()?.to_uppercase();
            match kind.as_str() {
                "EXISTS" => Ok(UntaggedResponse::Exists(n)),
                "RECENT" => Ok(UntaggedResponse::Recent(n)),
                "EXPUNGE" => Ok(UntaggedResponse::Expunge(n)),
                "FETCH" => {
                    let seq = SeqNum::new(n).ok_or_else(|| lexer.error("FETCH for message 0"))?;
                    lexer.expect_space()?;
                    let items = parse_fetch_items(lexer)?;
                    Ok(UntaggedResponse::Fetch { seq, items })
                }
                _ => Ok(UntaggedResponse::Other(format!("{n} {kind} {}", lexer.read_text()))),
            }
        }
        Token::Atom(name) => {
            if let Some(status) = Status::from_word(name) {
                let (code, text) = parse_resp_text(lexer)?;
                return Ok(UntaggedResponse::Status { status, code, text });
            }
            match name.to_uppercase().as_str() {
                "CAPABILITY" => Ok(UntaggedResponse::Capability(parse_capabilities(lexer))),
                "LIST" | "LSUB" => {
                    lexer.expect_space()?;
                    parse_list(lexer).map(UntaggedResponse::List)
                }
                "SEARCH" => Ok(UntaggedResponse::Search(parse_search(lexer))),
                "FLAGS" => {
                    lexer.expect_space()?;
                    parse_flag_list(lexer).map(UntaggedResponse::Flags)
                }
                _ => Ok(UntaggedResponse::Other(format!("{name}{}", lexer.read_text()))),
            }
        }
        token => Err(lexer.error(&format!("Unexpected untagged data: {token:?}"))),
    }
}

/// Parses `[code] text` after a status word.
fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    lexer.skip_spaces();
    let code = if lexer.peek() == Some(b'[') {
        lexer.expect(&Token::LBracket)?;
        let code = parse_response_code(lexer)?;
        lexer.skip_spaces();
        Some(code)
    } else {
        None
    };
    Ok((code, lexer.read_text()))
}

/// Reads a response code up to `]`; the `[` is already consumed.
fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    let inner = lexer.take_until(b']')?;
    Ok(ResponseCode::parse(&String::from_utf8_lossy(inner)))
}

fn parse_capabilities(lexer: &mut Lexer<'_>) -> Vec<Capability> {
    Capability::parse_list(&lexer.read_text())
}

/// Parses `(\Flag1 \Flag2 keyword)`.
pub(super) fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
    lexer.expect(&Token::LParen)?;
    let mut flags: Vec<String> = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => return Ok(flags),
            Token::Space => {}
            Token::Atom(flag) => flags.push(flag.to_string()),
            // `\*` lexes as `\` followed by an asterisk.
            Token::Asterisk => match flags.last_mut() {
                Some(last) if last == "\\" => last.push('*'),
                _ => flags.push("*".to_string()),
            },
            token => return Err(lexer.error(&format!("Unexpected token in flag list: {token:?}"))),
        }
    }
}

/// Parses `(attrs) delimiter mailbox` from a LIST line.
fn parse_list(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    let attributes = parse_flag_list(lexer)?
        .iter()
        .map(|a| MailboxAttribute::parse(a))
        .collect();
    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Quoted(d) => d.chars().next(),
        Token::Nil => None,
        token => return Err(lexer.error(&format!("Expected delimiter, got {token:?}"))),
    };
    lexer.expect_space()?;

    let name = lexer.read_astring()?;
    Ok(ListResponse {
        attributes,
        delimiter,
        name,
    })
}

/// Parses the numbers of a SEARCH response, ignoring anything else.
fn parse_search(lexer: &mut Lexer<'_>) -> Vec<SeqNum> {
    lexer
        .read_text()
        .split_whitespace()
        .filter_map(|n| n.parse::<SeqNum>().ok())
        .collect()
}

impl Response {
    /// Returns the error this tagged NO/BAD/BYE stands for, if any.
    #[must_use]
    pub fn as_error(&self) -> Option<Error> {
        let (status, text) = match self {
            Self::Tagged { status, text, .. } => (*status, text),
            Self::Untagged(UntaggedResponse::Status { status, text, .. }) => (*status, text),
            _ => return None,
        };
        match status {
            Status::No => Some(Error::No(text.clone())),
            Status::Bad => Some(Error::Bad(text.clone())),
            Status::Bye => Some(Error::Bye(text.clone())),
            Status::Ok | Status::PreAuth => None,
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
    fn test_greeting() {
        let response =
            ResponseParser::parse(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] Dovecot ready.\r\n")
                .unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Status {
                status: Status::Ok,
                code: Some(ResponseCode::Capability(caps)),
                text,
            }) => {
                assert_eq!(
                    caps,
                    vec![Capability::Imap4Rev1, Capability::Auth("PLAIN".to_string())]
                );
                assert_eq!(text, "Dovecot ready.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tagged_ok_with_code() {
        let response =
            ResponseParser::parse(b"A0002 OK [READ-ONLY] EXAMINE completed\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: "A0002".to_string(),
                status: Status::Ok,
                code: Some(ResponseCode::ReadOnly),
                text: "EXAMINE completed".to_string(),
            }
        );
    }

    #[test]
    fn test_tagged_no_authentication_failed() {
        let response =
            ResponseParser::parse(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
                .unwrap();
        match &response {
            Response::Tagged { status, code, .. } => {
                assert_eq!(*status, Status::No);
                assert_eq!(*code, Some(ResponseCode::AuthenticationFailed));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            response.as_error(),
            Some(Error::No(text)) if text == "Invalid credentials"
        ));
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation {
                text: "Ready for literal".to_string()
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: String::new() }
        );
    }

    #[test]
    fn test_exists_recent() {
        assert_eq!(
            ResponseParser::parse(b"* 172 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(172))
        );
        assert_eq!(
            ResponseParser::parse(b"* 1 RECENT\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Recent(1))
        );
    }

    #[test]
    fn test_search() {
        let response = ResponseParser::parse(b"* SEARCH 2 84 882\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Search(ids)) = response else {
            panic!("expected SEARCH");
        };
        let ids: Vec<u32> = ids.into_iter().map(SeqNum::get).collect();
        assert_eq!(ids, vec![2, 84, 882]);
    }

    #[test]
    fn test_search_empty() {
        assert_eq!(
            ResponseParser::parse(b"* SEARCH\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(Vec::new()))
        );
    }

    #[test]
    fn test_list() {
        let response =
            ResponseParser::parse(b"* LIST (\\HasNoChildren) \"/\" \"Sent Items\"\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::List(list)) = response else {
            panic!("expected LIST");
        };
        assert_eq!(list.attributes, vec![MailboxAttribute::Other("\\HasNoChildren".to_string())]);
        assert_eq!(list.delimiter, Some('/'));
        assert_eq!(list.name(), "Sent Items");
    }

    #[test]
    fn test_list_atom_name_and_nil_delimiter() {
        let response = ResponseParser::parse(b"* LIST (\\Noselect) NIL Public\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::List(list)) = response else {
            panic!("expected LIST");
        };
        assert!(!list.is_selectable());
        assert_eq!(list.delimiter, None);
        assert_eq!(list.name(), "Public");
    }

    #[test]
    fn test_list_literal_name() {
        let response =
            ResponseParser::parse(b"* LIST () \".\" {9}\r\nEntw\xc3\xbcrfe\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::List(list)) = response else {
            panic!("expected LIST");
        };
        assert_eq!(list.name(), "Entwürfe");
    }

    #[test]
    fn test_bracket_code_with_flag_list() {
        let response =
            ResponseParser::parse(b"* OK [PERMANENTFLAGS (\\Seen \\*)] Limited\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Status { code, text, .. }) = response else {
            panic!("expected status");
        };
        assert!(matches!(
            code,
            Some(ResponseCode::Other { ref name, .. }) if name == "PERMANENTFLAGS"
        ));
        assert_eq!(text, "Limited");
    }

    #[test]
    fn test_uidvalidity_code() {
        let response =
            ResponseParser::parse(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Status { code, .. }) = response else {
            panic!("expected status");
        };
        assert_eq!(code, Some(ResponseCode::UidValidity(3857529045)));
    }

    #[test]
    fn test_unknown_code_with_arguments() {
        let response =
            ResponseParser::parse(b"* OK [HIGHESTMODSEQ 715194045007] Highest\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Status { code, text, .. }) = response else {
            panic!("expected status");
        };
        assert_eq!(
            code,
            Some(ResponseCode::Other {
                name: "HIGHESTMODSEQ".to_string(),
                args: "715194045007".to_string(),
            })
        );
        assert_eq!(text, "Highest");
    }

    #[test]
    fn test_bye() {
        let response = ResponseParser::parse(b"* BYE Autologout; idle for too long\r\n").unwrap();
        assert!(matches!(response.as_error(), Some(Error::Bye(_))));
    }

    #[test]
    fn test_other_untagged() {
        let response = ResponseParser::parse(b"* NAMESPACE ((\"\" \"/\")) NIL NIL\r\n").unwrap();
        assert!(matches!(response, Response::Untagged(UntaggedResponse::Other(_))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(ResponseParser::parse(b"(oops)\r\n"), Err(Error::Parse { .. })));
    }
}

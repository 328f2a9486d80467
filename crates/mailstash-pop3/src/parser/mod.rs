//! POP3 response parser.
//!
//! Every response starts with a status line:
//! - Positive: `+OK 2 messages\r\n`
//! - Negative: `-ERR no such message\r\n`
//!
//! LIST and RETR follow a positive status line with a multi-line body that
//! ends at a line holding a single `.`. Body lines starting with `.` are
//! byte-stuffed by the server and must be unstuffed.

use crate::error::{Error, Result};
use crate::types::{MailboxStat, MessageInfo, Reply, Status};

/// Parses a status line with its line ending already removed.
///
/// # Errors
///
/// Returns an error if the line starts with neither `+OK` nor `-ERR`.
pub fn parse_reply(line: &[u8]) -> Result<Reply> {
    let text = String::from_utf8_lossy(line);
    let (indicator, rest) = text.split_once(' ').unwrap_or((text.as_ref(), ""));

    let status = if indicator.eq_ignore_ascii_case("+OK") {
        Status::Ok
    } else if indicator.eq_ignore_ascii_case("-ERR") {
        Status::Err
    } else {
        return Err(Error::Protocol(format!("Invalid status line: {text}")));
    };

    Ok(Reply::new(status, rest.trim()))
}

/// Returns true if `line` ends a multi-line response.
#[must_use]
pub fn is_terminator(line: &[u8]) -> bool {
    line == b"."
}

/// Removes the byte-stuffing dot from a multi-line body line.
#[must_use]
pub fn unstuff(line: &[u8]) -> &[u8] {
    if line.starts_with(b"..") { &line[1..] } else { line }
}

/// Rejoins unstuffed body lines, each terminated with CRLF.
#[must_use]
pub fn join_lines(lines: &[Vec<u8>]) -> Vec<u8> {
    let capacity = lines.iter().map(|l| l.len() + 2).sum();
    let mut out = Vec::with_capacity(capacity);
    for line in lines {
        out.extend_from_slice(unstuff(line));
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Parses one scan listing line such as `1 120`.
///
/// Only the first token is required; it is the message id.
///
/// # Errors
///
/// Returns an error if the line is blank.
pub fn parse_listing_line(line: &[u8]) -> Result<MessageInfo> {
    let text = String::from_utf8_lossy(line);
    let mut tokens = text.split_whitespace();

    let id = tokens
        .next()
        .ok_or_else(|| Error::Protocol("Empty scan listing line".into()))?
        .to_string();
    let size = tokens.next().and_then(|s| s.parse().ok());

    Ok(MessageInfo { id, size })
}

/// Parses the text of a STAT reply, `<count> <size>`.
///
/// # Errors
///
/// Returns an error if either number is missing or malformed.
pub fn parse_stat(text: &str) -> Result<MailboxStat> {
    let mut tokens = text.split_whitespace();
    let mut number = |what: &str| {
        tokens
            .next()
            .and_then(|t| t.parse::<u64>().ok())
            .ok_or_else(|| Error::Protocol(format!("Malformed STAT {what}: {text}")))
    };

    let count = number("count")?;
    let size = number("size")?;
    let count = u32::try_from(count)
        .map_err(|_| Error::Protocol(format!("STAT count out of range: {count}")))?;

    Ok(MailboxStat { count, size })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_reply() {
        let reply = parse_reply(b"+OK POP3 server ready").unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.text, "POP3 server ready");
    }

    #[test]
    fn test_parse_bare_ok() {
        let reply = parse_reply(b"+OK").unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.text, "");
    }

    #[test]
    fn test_parse_err_reply() {
        let reply = parse_reply(b"-ERR [AUTH] invalid password").unwrap();
        assert_eq!(reply.status, Status::Err);
        assert_eq!(reply.text, "[AUTH] invalid password");
    }

    #[test]
    fn test_parse_invalid_status() {
        assert!(parse_reply(b"* OK imap greeting").is_err());
        assert!(parse_reply(b"").is_err());
    }

    #[test]
    fn test_terminator() {
        assert!(is_terminator(b"."));
        assert!(!is_terminator(b".."));
        assert!(!is_terminator(b". "));
    }

    #[test]
    fn test_join_lines_unstuffs() {
        let lines = vec![
            b"Subject: dots".to_vec(),
            Vec::new(),
            b"..leading dot".to_vec(),
            b"plain".to_vec(),
        ];
        assert_eq!(join_lines(&lines), b"Subject: dots\r\n\r\n.leading dot\r\nplain\r\n");
    }

    #[test]
    fn test_join_lines_empty() {
        assert!(join_lines(&[]).is_empty());
    }

    #[test]
    fn test_parse_listing_line() {
        let info = parse_listing_line(b"3 1205").unwrap();
        assert_eq!(info.id, "3");
        assert_eq!(info.size, Some(1205));

        let info = parse_listing_line(b"4").unwrap();
        assert_eq!(info.id, "4");
        assert_eq!(info.size, None);

        assert!(parse_listing_line(b"   ").is_err());
    }

    #[test]
    fn test_parse_stat() {
        let stat = parse_stat("2 320").unwrap();
        assert_eq!(stat.count, 2);
        assert_eq!(stat.size, 320);

        assert!(parse_stat("2").is_err());
        assert!(parse_stat("two 320").is_err());
    }
}

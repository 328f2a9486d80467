//! MIME message structure and handling.

use crate::content_type::ContentType;
use crate::disposition::ContentDisposition;
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Nesting limit for multipart and `message/rfc822` bodies.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// MIME body part. The top-level message is itself a part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Undecoded body bytes. Empty for multipart containers.
    pub body: Vec<u8>,
    /// Child parts of a multipart container, or the enclosed message of a
    /// `message/rfc822` part.
    pub children: Vec<Part>,
}

impl Part {
    /// Creates a leaf part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            children: Vec::new(),
        }
    }

    /// Parses a part, recursing into multipart and `message/rfc822` bodies.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self::parse_at_depth(raw, 0)
    }

    fn parse_at_depth(raw: &[u8], depth: usize) -> Self {
        let (header_bytes, body) = split_header_body(raw);
        let mut part = Self::new(Headers::parse_bytes(header_bytes), Vec::new());
        let content_type = part.content_type();

        if depth >= MAX_DEPTH {
            part.body = body.to_vec();
        } else if content_type.is_multipart()
            && let Some(boundary) = content_type.boundary()
        {
            part.children = split_multipart(body, &boundary)
                .into_iter()
                .map(|chunk| Self::parse_at_depth(chunk, depth + 1))
                .collect();
        } else if content_type.is("message", "rfc822") {
            part.body = body.to_vec();
            part.children.push(Self::parse_at_depth(body, depth + 1));
        } else {
            part.body = body.to_vec();
        }

        part
    }

    /// Gets the content type, defaulting to `text/plain` when the header is
    /// missing or malformed (RFC 2045 §5.2).
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(ContentType::rfc2045_default)
    }

    /// Gets the content disposition, if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the declared filename, RFC 2047 decoded.
    ///
    /// Looks at the disposition `filename` parameter first and falls back to
    /// the content type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|cd| cd.filename())
            .or_else(|| self.content_type().param("name"))
            .map(|name| decode_rfc2047(&name))
            .filter(|name| !name.trim().is_empty())
    }

    /// Returns true if this part should be saved as an attachment.
    ///
    /// A part qualifies when it carries a filename and is either explicitly
    /// an `attachment`, or is not `inline` and is neither text nor multipart.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        if self.filename().is_none() {
            return false;
        }
        let disposition = self.disposition();
        if disposition.as_ref().is_some_and(ContentDisposition::is_attachment) {
            return true;
        }
        let inline = disposition.as_ref().is_some_and(ContentDisposition::is_inline);
        let content_type = self.content_type();
        !inline && !content_type.is_text() && !content_type.is_multipart()
    }

    /// Returns true for a multipart container with parsed children.
    #[must_use]
    pub fn is_container(&self) -> bool {
        !self.children.is_empty() && self.content_type().is_multipart()
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error for multipart containers, which carry no payload of
    /// their own, and for invalid Base64.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        if self.is_container() {
            return Err(Error::Malformed("multipart container has no payload".to_string()));
        }
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as text in its declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if transfer decoding fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        let charset = self
            .content_type()
            .charset()
            .unwrap_or_else(|| "utf-8".to_string());
        Ok(decode_charset(&decoded, &charset))
    }

    /// Returns this part and all descendants, depth-first.
    #[must_use]
    pub fn walk(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Self>) {
        out.push(self);
        for child in &self.children {
            child.collect_into(out);
        }
    }
}

/// Parsed MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or whitespace only.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Malformed("empty message".to_string()));
        }
        Ok(Self {
            root: Part::parse(raw),
        })
    }

    /// Top-level part.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.root.headers.get_decoded("subject")
    }

    /// Decoded From header.
    #[must_use]
    pub fn from(&self) -> Option<String> {
        self.root.headers.get_decoded("from")
    }

    /// Decoded To header.
    #[must_use]
    pub fn to(&self) -> Option<String> {
        self.root.headers.get_decoded("to")
    }

    /// Raw Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.root.headers.get("date")
    }

    /// Raw Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.root.headers.get("message-id")
    }

    /// All parts, depth-first, starting with the top level.
    #[must_use]
    pub fn parts(&self) -> Vec<&Part> {
        self.root.walk()
    }

    /// Parts that qualify as attachments, in tree order.
    #[must_use]
    pub fn attachments(&self) -> Vec<&Part> {
        self.parts()
            .into_iter()
            .filter(|part| part.is_attachment())
            .collect()
    }

    /// Concatenated text of all `text/plain` parts that are not attachments,
    /// cut at `max_chars` characters.
    #[must_use]
    pub fn text_sample(&self, max_chars: usize) -> String {
        let mut sample = String::new();
        for part in self.parts() {
            if !part.content_type().is("text", "plain")
                || part.disposition().is_some_and(|cd| cd.is_attachment())
            {
                continue;
            }
            if let Ok(text) = part.body_text() {
                sample.push_str(&text);
            }
            if sample.chars().count() >= max_chars {
                break;
            }
        }
        sample.chars().take(max_chars).collect()
    }
}

/// Splits raw bytes at the first empty line.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(rest) = raw.strip_prefix(b"\r\n") {
        return (&[], rest);
    }
    if let Some(rest) = raw.strip_prefix(b"\n") {
        return (&[], rest);
    }

    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find(raw, b"\n\n").map(|i| (i, i + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((end, body_start)) => (&raw[..end], &raw[body_start..]),
        None => (raw, &[]),
    }
}

/// Splits a multipart body into its parts. Preamble and epilogue are
/// dropped. An unterminated final part is kept.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = find(&body[pos..], b"\n").map_or(body.len(), |i| pos + i + 1);
        let line = &body[pos..line_end];

        if let Some(rest) = line.strip_prefix(delimiter) {
            let closing = rest.starts_with(b"--");
            if closing || rest.iter().all(u8::is_ascii_whitespace) {
                if let Some(start) = current_start.take() {
                    parts.push(strip_line_ending(&body[start..pos]));
                }
                if closing {
                    return parts;
                }
                current_start = Some(line_end);
            }
        }
        pos = line_end;
    }

    if let Some(start) = current_start {
        parts.push(&body[start..]);
    }
    parts
}

fn strip_line_ending(chunk: &[u8]) -> &[u8] {
    chunk
        .strip_suffix(b"\r\n")
        .or_else(|| chunk.strip_suffix(b"\n"))
        .unwrap_or(chunk)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
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

    const MIXED: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: bob@example.com\r\n\
Subject: =?utf-8?Q?Quartalsbericht_f=C3=BCr_Q3?=\r\n\
Message-ID: <abc@example.com>\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
preamble\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Hallo Bob, anbei der Bericht f=C3=BCr Q3.\r\n\
--inner\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>Hallo</p>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: application/pdf; name=\"report.pdf\"\r\n\
Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--outer\r\n\
Content-Type: image/png; name=\"logo.png\"\r\n\
Content-Disposition: inline; filename=\"logo.png\"\r\n\
\r\n\
PNGDATA\r\n\
--outer--\r\n\
epilogue\r\n";

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
    }

    #[test]
    fn test_single_part() {
        let raw = b"From: sender@example.com\r\nSubject: Test\r\n\r\nHello, World!";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.from().as_deref(), Some("sender@example.com"));
        assert_eq!(message.subject().as_deref(), Some("Test"));
        assert_eq!(message.root().body_text().unwrap(), "Hello, World!");
        assert_eq!(message.parts().len(), 1);
        assert!(message.attachments().is_empty());
    }

    #[test]
    fn test_lf_only_message() {
        let message = Message::parse(b"Subject: lf\n\nbody\n").unwrap();
        assert_eq!(message.subject().as_deref(), Some("lf"));
        assert_eq!(message.root().body, b"body\n");
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(Message::parse(b"").is_err());
        assert!(Message::parse(b" \r\n").is_err());
    }

    #[test]
    fn test_nested_multipart_walk() {
        let message = Message::parse(MIXED).unwrap();
        assert_eq!(message.subject().as_deref(), Some("Quartalsbericht für Q3"));

        let types: Vec<String> = message
            .parts()
            .iter()
            .map(|p| p.content_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "text/html",
                "application/pdf",
                "image/png",
            ]
        );
    }

    #[test]
    fn test_attachments_respect_inline() {
        let message = Message::parse(MIXED).unwrap();
        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("report.pdf"));
        assert_eq!(attachments[0].decode_body().unwrap(), b"%PDF-1.4\n");
    }

    #[test]
    fn test_text_sample() {
        let message = Message::parse(MIXED).unwrap();
        assert_eq!(message.text_sample(2000), "Hallo Bob, anbei der Bericht für Q3.");
        assert_eq!(message.text_sample(5), "Hallo");
    }

    #[test]
    fn test_container_has_no_payload() {
        let message = Message::parse(MIXED).unwrap();
        assert!(message.root().is_container());
        assert!(message.root().decode_body().is_err());
    }

    #[test]
    fn test_attachment_without_disposition() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: text/plain; name=notes.txt\r\n\r\n\
text\r\n\
--b\r\n\
Content-Type: application/zip; name=\"=?utf-8?B?w6RyZ2VyLnppcA==?=\"\r\n\r\n\
PK\r\n\
--b--\r\n";
        let message = Message::parse(raw).unwrap();
        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("ärger.zip"));
    }

    #[test]
    fn test_unterminated_multipart() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
                    --b\r\n\r\nfirst\r\n--b\r\n\r\nsecond, cut";
        let message = Message::parse(raw).unwrap();
        let parts = message.parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].body, b"first");
        assert_eq!(parts[2].body, b"second, cut");
    }

    #[test]
    fn test_forwarded_message_is_walked() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: message/rfc822\r\n\r\n\
Subject: inner\r\n\
Content-Type: application/octet-stream; name=data.bin\r\n\r\n\
xyz\r\n\
--b--\r\n";
        let message = Message::parse(raw).unwrap();
        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("data.bin"));
        assert_eq!(attachments[0].decode_body().unwrap(), b"xyz");
    }

    #[test]
    fn test_latin1_body_text() {
        let raw = b"Content-Type: text/plain; charset=iso-8859-1\r\n\r\nGr\xfc\xdfe";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.root().body_text().unwrap(), "Grüße");
    }
}

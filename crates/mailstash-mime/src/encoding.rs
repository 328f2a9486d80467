//! Transfer and header decoding.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 encoded words and RFC 2231
//! extended parameter values. Decoding is lenient: archived mail comes from
//! arbitrary senders, so malformed input degrades to its literal form instead
//! of failing the whole message.

use crate::error::Result;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 engine that accepts both padded and unpadded input.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable bytes (RFC 2045).
///
/// Soft line breaks are removed. Escapes that are not two hex digits are
/// copied through unchanged.
#[must_use]
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        match input.get(i + 1..i + 3) {
            Some(b"\r\n") => i += 3,
            Some([b'\n', _]) => i += 2,
            Some([hi, lo]) => match (hex_value(*hi), hex_value(*lo)) {
                (Some(hi), Some(lo)) => {
                    result.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    result.push(b'=');
                    i += 1;
                }
            },
            _ => {
                // "=\n" at the very end is still a soft break
                if input.get(i + 1) != Some(&b'\n') {
                    result.push(b'=');
                }
                i = input.len();
            }
        }
    }

    result
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Converts bytes in the named charset to a string.
///
/// UTF-8 and ASCII are decoded lossily. The ISO-8859-1 family and
/// Windows-1252 are mapped byte-for-code-point. Unknown charsets fall back
/// to lossy UTF-8.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    match charset.trim().to_ascii_lowercase().as_str() {
        "iso-8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "iso-8859-15" | "windows-1252"
        | "cp1252" => bytes.iter().map(|&b| char::from(b)).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Format: `=?charset?encoding?encoded-text?=`. Text outside encoded words
/// is preserved; whitespace separating two adjacent encoded words is dropped.
/// Words that fail to decode are left as-is.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        if let Some((decoded, consumed)) = parse_encoded_word(candidate) {
            if !(last_was_word && before.chars().all(char::is_whitespace)) {
                out.push_str(before);
            }
            out.push_str(&decoded);
            rest = &candidate[consumed..];
            last_was_word = true;
        } else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            last_was_word = false;
        }
    }

    out.push_str(rest);
    out
}

fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let (charset, after_charset) = inner.split_once('?')?;
    let (encoding, after_encoding) = after_charset.split_once('?')?;
    let end = after_encoding.find("?=")?;
    let payload = &after_encoding[..end];

    if charset.is_empty() || payload.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload).ok()?,
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    // RFC 2231 allows a language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    let consumed = s.len() - after_encoding.len() + end + 2;
    Some((decode_charset(&bytes, charset), consumed))
}

/// Decodes an RFC 2231 extended parameter value (`charset'lang'%XX...`).
///
/// Values without the charset prefix are percent-decoded as UTF-8.
#[must_use]
pub fn decode_rfc2231(value: &str) -> String {
    let mut pieces = value.splitn(3, '\'');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(charset), Some(_lang), Some(encoded)) => {
            decode_charset(&percent_decode(encoded), charset)
        }
        _ => String::from_utf8_lossy(&percent_decode(value)).into_owned(),
    }
}

fn percent_decode(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| hex_value(*b)),
                bytes.get(i + 2).and_then(|b| hex_value(*b)),
            )
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
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
    fn test_base64_encode_decode() {
        let encoded = encode_base64(b"Hello, World!");
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&encoded).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_base64_wrapped_and_unpadded() {
        assert_eq!(decode_base64("SGVsbG8s\r\nIFdvcmxkIQ").unwrap(), b"Hello, World!");
        assert!(decode_base64("not base64 !!").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello, World!"), b"Hello, World!");
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"h=c3=a9"), "hé".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"trailing=\n"), b"trailing");
    }

    #[test]
    fn test_quoted_printable_invalid_escape_kept() {
        assert_eq!(decode_quoted_printable(b"a=ZZb"), b"a=ZZb");
        assert_eq!(decode_quoted_printable(b"end="), b"end=");
    }

    #[test]
    fn test_rfc2047_plain_text_untouched() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("a =? b"), "a =? b");
    }

    #[test]
    fn test_rfc2047_base64() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_encoding() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_Welt?="), "Héllo Welt");
        assert_eq!(decode_rfc2047("=?ISO-8859-1?Q?Gr=FC=DFe?="), "Grüße");
    }

    #[test]
    fn test_rfc2047_adjacent_words_joined() {
        let value = "=?utf-8?Q?Rech?= \r\n =?utf-8?Q?nung?=";
        assert_eq!(decode_rfc2047(value), "Rechnung");
    }

    #[test]
    fn test_rfc2047_mixed_with_text() {
        let value = "Re: =?utf-8?B?w5xiZXJzaWNodA==?= (2024)";
        assert_eq!(decode_rfc2047(value), "Re: Übersicht (2024)");
    }

    #[test]
    fn test_rfc2047_malformed_kept() {
        assert_eq!(decode_rfc2047("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
    }

    #[test]
    fn test_rfc2231() {
        assert_eq!(decode_rfc2231("utf-8''%C3%BCbersicht.pdf"), "übersicht.pdf");
        assert_eq!(decode_rfc2231("iso-8859-1'de'Gr%FC%DFe.txt"), "Grüße.txt");
        assert_eq!(decode_rfc2231("plain%20name.txt"), "plain name.txt");
    }

    #[test]
    fn test_decode_charset_fallback() {
        assert_eq!(decode_charset(&[0xE9], "latin1"), "é");
        assert_eq!(decode_charset("ok".as_bytes(), "x-unknown"), "ok");
    }

    proptest::proptest! {
        #[test]
        fn test_rfc2047_leaves_plain_text_alone(text in "[^=]{0,64}") {
            proptest::prop_assert_eq!(decode_rfc2047(&text), text);
        }

        #[test]
        fn test_quoted_printable_never_grows(
            input in proptest::collection::vec(proptest::num::u8::ANY, 0..256),
        ) {
            proptest::prop_assert!(decode_quoted_printable(&input).len() <= input.len());
        }
    }
}

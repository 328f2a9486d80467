//! Structured header parameters (`; key=value` lists).

use crate::encoding::decode_rfc2231;

/// Parameters of a structured header such as `Content-Type`.
///
/// Keys are stored lowercased. Lookups understand RFC 2231 extended
/// (`name*`) and continued (`name*0`, `name*1*`, ...) forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    /// Parses a `;`-separated parameter list.
    ///
    /// Semicolons inside quoted strings do not split. Entries without `=`
    /// are ignored.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let entries = split_unquoted(input, ';')
            .into_iter()
            .filter_map(|piece| {
                let (key, value) = piece.split_once('=')?;
                let key = key.trim().to_ascii_lowercase();
                if key.is_empty() {
                    return None;
                }
                Some((key, unquote(value.trim())))
            })
            .collect();
        Self { entries }
    }

    /// Adds a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((key.into().to_ascii_lowercase(), value.into()));
    }

    /// Returns the raw value stored under `key`, without RFC 2231 handling.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the decoded value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();

        if let Some(value) = self.raw(&format!("{name}*")) {
            return Some(decode_rfc2231(value));
        }

        let mut joined = String::new();
        let mut extended = false;
        for index in 0.. {
            if let Some(value) = self.raw(&format!("{name}*{index}*")) {
                extended = true;
                joined.push_str(value);
            } else if let Some(value) = self.raw(&format!("{name}*{index}")) {
                joined.push_str(value);
            } else {
                break;
            }
        }
        if !joined.is_empty() {
            return Some(if extended {
                decode_rfc2231(&joined)
            } else {
                joined
            });
        }

        self.raw(&name).map(str::to_string)
    }

    /// Returns true if no parameters were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits on `sep` outside double-quoted strings.
pub(crate) fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                pieces.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&input[start..]);
    pieces
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .map(|v| v.strip_suffix('"').unwrap_or(v))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
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
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let params = Parameters::parse(" charset=utf-8; format=flowed");
        assert_eq!(params.get("charset").as_deref(), Some("utf-8"));
        assert_eq!(params.get("FORMAT").as_deref(), Some("flowed"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_parse_quoted_with_semicolon() {
        let params = Parameters::parse(r#" filename="a;b \"c\".txt"; size=10"#);
        assert_eq!(params.get("filename").as_deref(), Some(r#"a;b "c".txt"#));
        assert_eq!(params.get("size").as_deref(), Some("10"));
    }

    #[test]
    fn test_extended_value() {
        let params = Parameters::parse(" filename*=utf-8''%C3%A4rger.txt");
        assert_eq!(params.get("filename").as_deref(), Some("ärger.txt"));
    }

    #[test]
    fn test_continuations() {
        let params = Parameters::parse(r#" filename*0="long"; filename*1="name.pdf""#);
        assert_eq!(params.get("filename").as_deref(), Some("longname.pdf"));

        let params = Parameters::parse(" name*0*=utf-8''%C3%BC; name*1=ber.txt");
        assert_eq!(params.get("name").as_deref(), Some("über.txt"));
    }

    #[test]
    fn test_split_unquoted() {
        assert_eq!(split_unquoted(r#"a;"b;c";d"#, ';'), vec!["a", r#""b;c""#, "d"]);
    }
}

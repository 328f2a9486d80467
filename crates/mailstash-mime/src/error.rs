//! Failures while taking a message apart.
//!
//! Parsing is lenient, so most malformed input degrades instead of
//! producing one of these.

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message or part could not be read.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `Content-Type` value without a usable `type/subtype`.
    #[error("bad content type: {0}")]
    ContentType(String),

    /// A base64 body that does not decode even after whitespace removal.
    #[error("undecodable base64 body")]
    Base64(#[from] base64::DecodeError),

    /// Input with no header/body structure to speak of.
    #[error("malformed message: {0}")]
    Malformed(String),
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
    use std::error::Error as _;

    use super::*;
    use base64::Engine as _;

    #[test]
    fn test_base64_keeps_source() {
        let cause = base64::engine::general_purpose::STANDARD.decode("@@@").unwrap_err();
        let err = Error::from(cause);
        assert_eq!(err.to_string(), "undecodable base64 body");
        assert!(err.source().is_some());
    }
}

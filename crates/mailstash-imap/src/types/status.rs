//! Status words that open a status response.

/// Word after the tag (or `*`) of a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `OK`.
    Ok,
    /// `NO`: the server understood the command and declined it.
    No,
    /// `BAD`: the server could not make sense of the command.
    Bad,
    /// `PREAUTH`: greeting of an already logged-in connection.
    PreAuth,
    /// `BYE`: the server is about to hang up.
    Bye,
}

impl Status {
    /// Matches a status word case-insensitively.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        [
            ("OK", Self::Ok),
            ("NO", Self::No),
            ("BAD", Self::Bad),
            ("PREAUTH", Self::PreAuth),
            ("BYE", Self::Bye),
        ]
        .into_iter()
        .find_map(|(spelling, status)| word.eq_ignore_ascii_case(spelling).then_some(status))
    }

    /// True for `NO` and `BAD`, the answers that leave the connection
    /// usable.
    #[must_use]
    pub const fn is_refusal(self) -> bool {
        matches!(self, Self::No | Self::Bad)
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
    fn test_from_word() {
        assert_eq!(Status::from_word("ok"), Some(Status::Ok));
        assert_eq!(Status::from_word("PreAuth"), Some(Status::PreAuth));
        assert_eq!(Status::from_word("BYE"), Some(Status::Bye));
        assert_eq!(Status::from_word("MAYBE"), None);
    }

    #[test]
    fn test_refusal() {
        assert!(Status::No.is_refusal());
        assert!(Status::Bad.is_refusal());
        assert!(!Status::Ok.is_refusal());
        assert!(!Status::Bye.is_refusal());
    }
}

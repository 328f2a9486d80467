//! Message sequence numbers.

use std::fmt;
use std::num::{NonZeroU32, ParseIntError};
use std::str::FromStr;

/// Position of a message in the examined folder, starting at 1.
///
/// Only meaningful within the session that produced it; an expunge from
/// another client can shift every number after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(NonZeroU32);

impl SeqNum {
    /// Returns `None` for 0, which no message can have.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// The number itself.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SeqNum {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NonZeroU32::from_str(s).map(Self)
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
    fn test_zero_rejected() {
        assert!(SeqNum::new(0).is_none());
        assert!("0".parse::<SeqNum>().is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let seq: SeqNum = "4711".parse().unwrap();
        assert_eq!(seq.get(), 4711);
        assert_eq!(seq.to_string(), "4711");
        assert!("x1".parse::<SeqNum>().is_err());
        assert!(SeqNum::new(3).unwrap() < seq);
    }
}

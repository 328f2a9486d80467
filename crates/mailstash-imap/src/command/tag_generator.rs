//! Command tags.

/// Hands out `A0001`, `A0002`, ... for one connection.
///
/// Past 9999 the number just gets wider; at `u32::MAX` it wraps to zero.
#[derive(Debug, Clone, Default)]
pub struct TagGenerator {
    issued: u32,
}

impl TagGenerator {
    /// Next unused tag.
    pub fn next_tag(&mut self) -> String {
        self.issued = self.issued.wrapping_add(1);
        format!("A{:04}", self.issued)
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
    fn test_tags_count_up() {
        let mut tags = TagGenerator::default();
        let first: Vec<String> = (0..3).map(|_| tags.next_tag()).collect();
        assert_eq!(first, ["A0001", "A0002", "A0003"]);
    }

    #[test]
    fn test_width_and_wrap() {
        let mut tags = TagGenerator { issued: 9_999 };
        assert_eq!(tags.next_tag(), "A10000");
        let mut tags = TagGenerator { issued: u32::MAX };
        assert_eq!(tags.next_tag(), "A0000");
    }
}

//! Message age classification.
//!
//! Messages older than the threshold go to the `archiv` tree, everything
//! else (including undated mail) to `emails`.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a message is filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Older than the threshold.
    Archive,
    /// Within the threshold, or undated.
    Recent,
}

impl Category {
    /// Directory name under the account folder.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Archive => "archiv",
            Self::Recent => "emails",
        }
    }
}

/// Parses a `Date:` header value.
///
/// Comments are stripped and whitespace collapsed before RFC 2822 parsing.
/// A value without a zone is read as UTC. The original offset is kept.
#[must_use]
pub fn extract_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = collapse_whitespace(&strip_comments(value));
    if cleaned.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(&cleaned)
        .or_else(|_| DateTime::parse_from_rfc2822(&format!("{cleaned} +0000")))
        .inspect_err(|e| debug!(date = value, error = %e, "Unparseable Date header"))
        .ok()
}

/// Decides the category of a message.
///
/// A message is archived only when it is strictly older than
/// `threshold_days`. A threshold too large to represent never archives.
#[must_use]
pub fn classify(
    date: Option<&DateTime<FixedOffset>>,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> Category {
    let Some(date) = date else {
        return Category::Recent;
    };
    let Some(threshold) = TimeDelta::try_days(threshold_days) else {
        return Category::Recent;
    };

    if now.signed_duration_since(date.with_timezone(&Utc)) > threshold {
        Category::Archive
    } else {
        Category::Recent
    }
}

/// Removes `( ... )` comments, nested ones included.
fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            escaped = false;
            if depth == 0 {
                out.push(c);
            }
            continue;
        }
        match c {
            '\\' if depth > 0 => escaped = true,
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
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
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    mod extract_tests {
        use super::*;

        #[test]
        fn test_plain_rfc2822() {
            let date = extract_date("Tue, 14 May 2024 09:30:00 +0200").unwrap();
            assert_eq!(date.offset().local_minus_utc(), 7200);
            assert_eq!(date.format("%Y%m%d_%H%M%S").to_string(), "20240514_093000");
        }

        #[test]
        fn test_comment_and_whitespace() {
            let date = extract_date("Tue,  14 May 2024\t09:30:00 +0000 (UTC)").unwrap();
            assert_eq!(
                date.with_timezone(&Utc),
                Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap()
            );
        }

        #[test]
        fn test_nested_comment() {
            assert!(extract_date("(sent (late)) 14 May 2024 09:30:00 -0500").is_some());
        }

        #[test]
        fn test_missing_zone_is_utc() {
            let date = extract_date("Tue, 14 May 2024 09:30:00").unwrap();
            assert_eq!(date.offset().local_minus_utc(), 0);
        }

        #[test]
        fn test_garbage() {
            assert!(extract_date("").is_none());
            assert!(extract_date("yesterday-ish").is_none());
            assert!(extract_date("(only a comment)").is_none());
        }
    }

    #[test]
    fn test_undated_is_recent() {
        assert_eq!(classify(None, 30, now()), Category::Recent);
    }

    #[test]
    fn test_threshold_is_strict() {
        let exactly = (now() - TimeDelta::days(30)).fixed_offset();
        assert_eq!(classify(Some(&exactly), 30, now()), Category::Recent);

        let older = (now() - TimeDelta::days(30) - TimeDelta::seconds(1)).fixed_offset();
        assert_eq!(classify(Some(&older), 30, now()), Category::Archive);
    }

    #[test]
    fn test_offset_is_respected() {
        // 31 days minus two hours in UTC terms
        let date = extract_date("Wed, 1 May 2024 12:00:00 -0200").unwrap();
        assert_eq!(classify(Some(&date), 31, now()), Category::Recent);
        assert_eq!(classify(Some(&date), 30, now()), Category::Archive);
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(Category::Archive.dir_name(), "archiv");
        assert_eq!(Category::Recent.dir_name(), "emails");
    }

    proptest! {
        #[test]
        fn test_classify_is_total(secs in any::<i64>(), days in any::<i64>()) {
            let date =
                DateTime::from_timestamp(secs % 253_402_300_799, 0).map(|d| d.fixed_offset());
            let a = classify(date.as_ref(), days, now());
            let b = classify(date.as_ref(), days, now());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn test_extract_date_never_panics(s in "\\PC{0,60}") {
            let _ = extract_date(&s);
        }
    }
}

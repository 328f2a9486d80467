//! Filesystem-safe names for archive paths.

use chrono::{DateTime, TimeZone};

use crate::account::AccountProfile;

/// Characters never allowed in an archive path component.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum subject length in characters.
pub const MAX_SUBJECT_CHARS: usize = 80;

/// Byte cap applied after the character cap, for 255-byte filename limits.
const MAX_SUBJECT_BYTES: usize = 180;

/// Fallback folder directory name.
pub const UNKNOWN_FOLDER: &str = "_unbekannter_ordner_";

/// Fallback subject.
pub const NO_SUBJECT: &str = "Kein_Betreff";

/// Replaces forbidden and control characters with `_` and trims.
///
/// Names made only of dots come back empty so they can never walk the
/// directory tree. Applying it twice changes nothing.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = replaced.trim();

    if trimmed.chars().all(|c| c == '.') {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Directory name for an account: the display name, else `konto_<local part>`.
#[must_use]
pub fn sanitize_account(account: &AccountProfile) -> String {
    let name = sanitize(&account.display_name);
    if name.is_empty() {
        sanitize(&format!("konto_{}", account.local_part()))
    } else {
        name
    }
}

/// Directory name for a server folder. Hierarchy separators become `__`.
#[must_use]
pub fn sanitize_folder(folder: &str) -> String {
    let name = sanitize(&folder.replace('/', "__"));
    if name.is_empty() { UNKNOWN_FOLDER.to_string() } else { name }
}

/// Filename fragment for a decoded subject, at most [`MAX_SUBJECT_CHARS`].
#[must_use]
pub fn sanitize_subject(subject: Option<&str>) -> String {
    let clean = sanitize(subject.unwrap_or_default());

    let mut truncated = String::new();
    for c in clean.chars().take(MAX_SUBJECT_CHARS) {
        if truncated.len() + c.len_utf8() > MAX_SUBJECT_BYTES {
            break;
        }
        truncated.push(c);
    }

    let truncated = truncated.trim_end();
    if truncated.is_empty() {
        NO_SUBJECT.to_string()
    } else {
        truncated.to_string()
    }
}

/// Filename for an attachment, else `Anhang_<unix ts>.bin`.
#[must_use]
pub fn sanitize_attachment_name<Tz: TimeZone>(name: Option<&str>, now: &DateTime<Tz>) -> String {
    let clean = sanitize(name.unwrap_or_default());
    if clean.is_empty() {
        format!("Anhang_{}.bin", now.timestamp())
    } else {
        clean
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
    clippy::similar_names,
)]
mod tests {
    use super::*;
    use crate::account::Protocol;
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_replaces_forbidden() {
        assert_eq!(sanitize(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize("tab\there\u{7}"), "tab_here_");
        assert_eq!(sanitize("  padded  "), "padded");
    }

    #[test]
    fn test_sanitize_dots() {
        assert_eq!(sanitize(".."), "");
        assert_eq!(sanitize(" . "), "");
        assert_eq!(sanitize(".hidden"), ".hidden");
    }

    #[test]
    fn test_account_fallback() {
        let named = AccountProfile::new("Work: Main", "anna@example.com", "h", 993, Protocol::Imap);
        assert_eq!(sanitize_account(&named), "Work_ Main");

        let unnamed = AccountProfile::new("   ", "anna@example.com", "h", 993, Protocol::Imap);
        assert_eq!(sanitize_account(&unnamed), "konto_anna");
    }

    #[test]
    fn test_folder() {
        assert_eq!(sanitize_folder("INBOX"), "INBOX");
        assert_eq!(sanitize_folder("Archive/2023"), "Archive__2023");
        assert_eq!(sanitize_folder(""), UNKNOWN_FOLDER);
        assert_eq!(sanitize_folder(".."), UNKNOWN_FOLDER);
    }

    #[test]
    fn test_subject() {
        assert_eq!(sanitize_subject(Some("Re: Hello?")), "Re_ Hello_");
        assert_eq!(sanitize_subject(None), NO_SUBJECT);
        assert_eq!(sanitize_subject(Some("  ")), NO_SUBJECT);

        let long = "x".repeat(200);
        assert_eq!(sanitize_subject(Some(&long)).chars().count(), MAX_SUBJECT_CHARS);

        let wide = "€".repeat(100);
        let cut = sanitize_subject(Some(&wide));
        assert!(cut.len() <= MAX_SUBJECT_BYTES);
        assert_eq!(cut.chars().count(), MAX_SUBJECT_BYTES / 3);
    }

    #[test]
    fn test_attachment_fallback() {
        let now = Utc::now();
        assert_eq!(sanitize_attachment_name(Some("report.pdf"), &now), "report.pdf");
        assert_eq!(
            sanitize_attachment_name(Some("///"), &now).len(),
            3,
            "underscores are a valid name"
        );
        assert_eq!(
            sanitize_attachment_name(None, &now),
            format!("Anhang_{}.bin", now.timestamp())
        );
    }

    proptest! {
        #[test]
        fn test_sanitize_idempotent(s in "\\PC{0,40}|[ ./<>:*?\\t]{0,10}") {
            let once = sanitize(&s);
            prop_assert_eq!(sanitize(&once), once.clone());
            prop_assert!(!once.contains(FORBIDDEN));
        }

        #[test]
        fn test_folder_never_empty(s in "\\PC{0,40}") {
            let name = sanitize_folder(&s);
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains('/'));
        }
    }
}

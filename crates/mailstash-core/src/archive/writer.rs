//! Deterministic, collision-safe archive files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use mailstash_mime::Message;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::sanitize::{
    sanitize_account, sanitize_attachment_name, sanitize_folder, sanitize_subject,
};
use crate::account::AccountProfile;
use crate::classifier::Category;
use crate::{Error, Result};

/// Default archive root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "EmailArchiv";

/// Attachment directory inside a day directory.
pub const ATTACHMENT_DIR: &str = "anhänge";

/// Names tried per file: the base name plus `_1` through `_99`.
const MAX_NAME_ATTEMPTS: usize = 100;

/// Archive root and path layout.
///
/// Paths are `<root>/<account>/<archiv|emails>/<folder>/<YYYY-MM-DD>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl ArchiveWriter {
    /// Creates a writer rooted at `root`. Nothing is created on disk yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Archive root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one message.
    #[must_use]
    pub fn storage_path(
        &self,
        account: &AccountProfile,
        category: Category,
        folder: &str,
        day: NaiveDate,
    ) -> PathBuf {
        self.root
            .join(sanitize_account(account))
            .join(category.dir_name())
            .join(sanitize_folder(folder))
            .join(day.format("%Y-%m-%d").to_string())
    }
}

/// Writes the raw message bytes into `dir` under a fresh name.
///
/// The name is `<timestamp>_<subject>_<suffix>.eml`. The timestamp is the
/// message date in its own offset, else `now` with microseconds. The suffix
/// is derived from the Message-ID, else the microseconds of `now`.
///
/// # Errors
///
/// Returns [`Error::Filesystem`] if no free name is found or the write fails.
pub fn write_message(
    dir: &Path,
    raw: &[u8],
    subject: Option<&str>,
    date: Option<&DateTime<FixedOffset>>,
    message_id: Option<&str>,
    now: &DateTime<Local>,
) -> Result<PathBuf> {
    let timestamp = date.map_or_else(
        || now.format("%Y%m%d_%H%M%S%6f").to_string(),
        |d| d.format("%Y%m%d_%H%M%S").to_string(),
    );
    let suffix = message_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| format!("{:06}", now.timestamp_subsec_micros() % 1_000_000), id_suffix);

    let stem = format!("{timestamp}_{}_{suffix}", sanitize_subject(subject));
    let path = create_unique(dir, &stem, Some("eml"), raw)?;
    debug!(path = %path.display(), bytes = raw.len(), "Message written");
    Ok(path)
}

/// Saves every attachment of `message` into `<dir>/anhänge/`.
///
/// Parts with no payload, undecodable payloads and per-file write failures
/// are logged and skipped. Returns the number of files written.
pub fn extract_attachments(message: &Message, dir: &Path, now: &DateTime<Local>) -> usize {
    let target = dir.join(ATTACHMENT_DIR);
    let mut created = false;
    let mut saved = 0;

    for part in message.attachments() {
        let declared = part.filename();
        let payload = match part.decode_body() {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!(filename = ?declared, "Attachment has no payload, skipped");
                continue;
            }
            Err(e) => {
                warn!(filename = ?declared, error = %e, "Attachment payload undecodable, skipped");
                continue;
            }
        };

        if !created {
            if let Err(e) = fs::create_dir_all(&target) {
                warn!(dir = %target.display(), error = %e, "Cannot create attachment directory");
                return saved;
            }
            created = true;
        }

        let name = sanitize_attachment_name(declared.as_deref(), now);
        let (stem, ext) = split_extension(&name);
        match create_unique(&target, stem, ext, &payload) {
            Ok(path) => {
                debug!(path = %path.display(), bytes = payload.len(), "Attachment written");
                saved += 1;
            }
            Err(e) => warn!(filename = %name, error = %e, "Attachment not saved"),
        }
    }

    saved
}

/// Six digits from the SHA-256 of a Message-ID.
fn id_suffix(message_id: &str) -> String {
    let digest = Sha256::digest(message_id.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    format!("{:06}", u64::from_be_bytes(head) % 1_000_000)
}

/// Splits `report.pdf` into `("report", Some("pdf"))`. Leading dots are
/// part of the stem.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(i) if i > 0 && i + 1 < name.len() => (&name[..i], Some(&name[i + 1..])),
        _ => (name, None),
    }
}

/// Creates `<stem>.<ext>`, or `<stem>_N.<ext>` for the first free `N`, and
/// writes `contents`. Existing files are never touched.
fn create_unique(dir: &Path, stem: &str, ext: Option<&str>, contents: &[u8]) -> Result<PathBuf> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let base = if attempt == 0 {
            stem.to_string()
        } else {
            format!("{stem}_{attempt}")
        };
        let path = match ext {
            Some(ext) => dir.join(format!("{base}.{ext}")),
            None => dir.join(base),
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::filesystem(path, e)),
        };

        if let Err(e) = file.write_all(contents).and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "Cannot remove partial file");
            }
            return Err(Error::filesystem(path, e));
        }
        return Ok(path);
    }

    Err(Error::filesystem(
        dir.join(stem),
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name after {MAX_NAME_ATTEMPTS} attempts"),
        ),
    ))
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
    use crate::account::Protocol;
    use crate::classifier::extract_date;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
            + chrono::TimeDelta::microseconds(4321)
    }

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn test_storage_path_layout() {
        let writer = ArchiveWriter::new("/arch");
        let account = AccountProfile::new("Work", "anna@example.com", "h", 993, Protocol::Imap);
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let path = writer.storage_path(&account, Category::Archive, "Archive/2023", day);
        assert_eq!(path, PathBuf::from("/arch/Work/archiv/Archive__2023/2024-06-01"));

        let path = writer.storage_path(&account, Category::Recent, "INBOX", day);
        assert_eq!(path, PathBuf::from("/arch/Work/emails/INBOX/2024-06-01"));
    }

    #[test]
    fn test_default_root() {
        assert_eq!(ArchiveWriter::default().root(), Path::new("EmailArchiv"));
    }

    #[test]
    fn test_write_message_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let raw = b"Subject: Hi\r\n\r\nbody\r\n";
        let date = extract_date("Tue, 14 May 2024 09:30:00 +0200").unwrap();

        let path = write_message(
            dir.path(),
            raw,
            Some("Hi: there"),
            Some(&date),
            Some("<a@b>"),
            &now(),
        )
        .unwrap();
        let name = file_name(&path);
        assert!(name.starts_with("20240514_093000_Hi_ there_"), "{name}");
        assert!(name.ends_with(".eml"));
        assert_eq!(name.len(), "20240514_093000_Hi_ there_".len() + 6 + 4);
        assert_eq!(fs::read(&path).unwrap(), raw);
    }

    #[test]
    fn test_message_id_suffix_is_stable() {
        assert_eq!(id_suffix("<a@b>"), id_suffix("<a@b>"));
        assert_ne!(id_suffix("<a@b>"), id_suffix("<c@d>"));
        assert_eq!(id_suffix("<x@y>").len(), 6);
    }

    #[test]
    fn test_undated_uses_write_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_message(dir.path(), b"x", None, None, None, &now()).unwrap();
        assert_eq!(file_name(&path), "20240601_120000004321_Kein_Betreff_004321.eml");
    }

    #[test]
    fn test_collisions_get_counters() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_message(dir.path(), b"1", None, None, None, &now()).unwrap();
        let second = write_message(dir.path(), b"2", None, None, None, &now()).unwrap();
        let third = write_message(dir.path(), b"3", None, None, None, &now()).unwrap();

        assert_ne!(first, second);
        assert!(file_name(&second).ends_with("_004321_1.eml"));
        assert!(file_name(&third).ends_with("_004321_2.eml"));
        assert_eq!(fs::read(&first).unwrap(), b"1");
    }

    #[test]
    fn test_collision_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..MAX_NAME_ATTEMPTS {
            create_unique(dir.path(), "same", Some("eml"), b"x").unwrap();
        }
        let err = create_unique(dir.path(), "same", Some("eml"), b"x").unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.pdf"), ("report", Some("pdf")));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", Some("gz")));
        assert_eq!(split_extension("README"), ("README", None));
        assert_eq!(split_extension(".profile"), (".profile", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
    }

    mod attachment_tests {
        use super::*;

        const TWO_REPORTS: &[u8] = b"Subject: Reports\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
\r\n\
--XX\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--XX\r\n\
Content-Type: application/pdf; name=\"report.pdf\"\r\n\
Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQ=\r\n\
--XX\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjU=\r\n\
--XX--\r\n";

        #[test]
        fn test_same_name_attachments() {
            let dir = tempfile::tempdir().unwrap();
            let message = Message::parse(TWO_REPORTS).unwrap();

            assert_eq!(extract_attachments(&message, dir.path(), &now()), 2);

            let target = dir.path().join(ATTACHMENT_DIR);
            assert_eq!(fs::read(target.join("report.pdf")).unwrap(), b"%PDF-1.4");
            assert_eq!(fs::read(target.join("report_1.pdf")).unwrap(), b"%PDF-1.5");
        }

        #[test]
        fn test_no_attachments_no_directory() {
            let dir = tempfile::tempdir().unwrap();
            let message = Message::parse(b"Subject: plain\r\n\r\nhello\r\n").unwrap();

            assert_eq!(extract_attachments(&message, dir.path(), &now()), 0);
            assert!(!dir.path().join(ATTACHMENT_DIR).exists());
        }

        #[test]
        fn test_encoded_filename() {
            let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"=?utf-8?B?w7xiZXIudHh0?=\"\r\n\
\r\n\
data\r\n\
--b--\r\n";
            let dir = tempfile::tempdir().unwrap();
            let message = Message::parse(raw).unwrap();

            assert_eq!(extract_attachments(&message, dir.path(), &now()), 1);
            assert!(dir.path().join(ATTACHMENT_DIR).join("über.txt").exists());
        }
    }
}

//! Fuzzy search across archived `.eml` files.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use mailstash_mime::{Headers, Message};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Bytes read from the start of each file.
pub const READ_LIMIT: u64 = 15 * 1024;

/// Characters of body text searched per message.
pub const SAMPLE_CHARS: usize = 2000;

/// Minimum score for a hit.
pub const MIN_SCORE: u8 = 70;

/// One matching archive file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Path of the `.eml` file.
    pub path: PathBuf,
    /// Decoded subject, empty if absent.
    pub subject: String,
    /// Raw Date header.
    pub date: Option<String>,
    /// File size in bytes.
    pub size: u64,
    /// Similarity score, 0 to 100.
    pub score: u8,
}

/// Searches every `.eml` below `root` for `term`.
///
/// Subject, From, To and the first [`SAMPLE_CHARS`] characters of plain-text
/// body are matched case-insensitively with [`partial_ratio`]. Hits are
/// sorted best first. Unreadable files are skipped.
#[must_use]
pub fn search_archive(root: &Path, term: &str) -> Vec<SearchHit> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cannot read archive entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_eml(path) {
            continue;
        }

        match score_file(path, &term) {
            Ok(Some(hit)) => hits.push(hit),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot search file"),
        }
    }

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
    debug!(root = %root.display(), hits = hits.len(), "Archive searched");
    hits
}

fn is_eml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
}

fn score_file(path: &Path, term: &str) -> std::io::Result<Option<SearchHit>> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut head = Vec::new();
    file.take(READ_LIMIT).read_to_end(&mut head)?;

    let Ok(message) = Message::parse(&head) else {
        return Ok(None);
    };
    let subject = message.subject().unwrap_or_default();
    let haystack = [
        subject.as_str(),
        message.from().as_deref().unwrap_or_default(),
        message.to().as_deref().unwrap_or_default(),
        message.text_sample(SAMPLE_CHARS).as_str(),
    ]
    .join(" ")
    .to_lowercase();

    let score = partial_ratio(term, &haystack);
    if score < MIN_SCORE {
        return Ok(None);
    }

    Ok(Some(SearchHit {
        path: path.to_path_buf(),
        subject,
        date: read_eml_date(path),
        size,
        score,
    }))
}

/// Reads the Date header of an `.eml` file without touching its body.
#[must_use]
pub fn read_eml_date(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file).take(READ_LIMIT);
    let mut block = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).ok()? == 0 {
            break;
        }
        if line == b"\r\n" || line == b"\n" {
            break;
        }
        block.extend_from_slice(&line);
    }

    Headers::parse_bytes(&block).get("date").map(str::to_string)
}

/// Best similarity of `needle` against any same-length window of
/// `haystack`, from 0 to 100.
///
/// Similarity is `1 - levenshtein / len`. If the needle is the longer
/// string the roles swap.
#[must_use]
pub fn partial_ratio(needle: &str, haystack: &str) -> u8 {
    let mut short: Vec<char> = needle.chars().collect();
    let mut long: Vec<char> = haystack.chars().collect();
    if short.len() > long.len() {
        std::mem::swap(&mut short, &mut long);
    }
    if short.is_empty() {
        return 0;
    }

    let n = short.len();
    let mut best = n;
    for window in long.windows(n) {
        best = best.min(levenshtein(&short, window));
        if best == 0 {
            break;
        }
    }

    let similarity = (n - best) * 100 / n;
    u8::try_from(similarity).unwrap_or(100)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Human-readable file size: `B`, `KB`, `MB` or `GB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b < KB => format!("{b} B"),
        b if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.1} MB", b as f64 / MB as f64),
        b => format!("{:.1} GB", b as f64 / GB as f64),
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

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_levenshtein() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn test_partial_ratio() {
        assert_eq!(partial_ratio("invoice", "your invoice for may"), 100);
        assert_eq!(partial_ratio("invoise", "your invoice for may"), 85);
        assert!(partial_ratio("holiday", "your invoice for may") < MIN_SCORE);
        assert_eq!(partial_ratio("", "anything"), 0);
        assert_eq!(partial_ratio("a much longer needle", "needle"), 100);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_read_eml_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.eml",
            "Subject: x\r\nDate: Tue, 14 May 2024 09:30:00 +0200\r\n\r\nDate: not this one\r\n",
        );
        assert_eq!(read_eml_date(&path).as_deref(), Some("Tue, 14 May 2024 09:30:00 +0200"));
        assert_eq!(read_eml_date(&dir.path().join("missing.eml")), None);
    }

    #[test]
    fn test_search_finds_subject_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        let hit = write(
            dir.path(),
            "Work/archiv/INBOX/2024-06-01/one.eml",
            concat!(
                "Subject: =?utf-8?Q?Quartalsbericht_f=C3=BCr_Q2?=\r\n",
                "From: boss@example.com\r\n\r\nPlease review.\r\n",
            ),
        );
        write(
            dir.path(),
            "Work/emails/INBOX/2024-06-01/two.eml",
            "Subject: Lunch\r\nFrom: friend@example.com\r\n\r\nPizza at noon?\r\n",
        );
        write(dir.path(), "notes.txt", "Quartalsbericht");

        let hits = search_archive(dir.path(), "QUARTALSBERICHT");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, hit);
        assert_eq!(hits[0].subject, "Quartalsbericht für Q2");
        assert_eq!(hits[0].score, 100);
    }

    #[test]
    fn test_search_body_text() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.eml", "Subject: hi\r\n\r\nThe parcel tracking number is 1Z999.\r\n");
        assert_eq!(search_archive(dir.path(), "tracking number").len(), 1);
    }

    #[test]
    fn test_search_empty_term() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.eml", "Subject: hi\r\n\r\nbody\r\n");
        assert!(search_archive(dir.path(), "  ").is_empty());
    }
}

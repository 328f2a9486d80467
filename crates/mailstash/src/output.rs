//! Text rendering of command results.

use std::fmt::Write;

use mailstash_core::{AccountProfile, JobResult, JobStatus, SearchHit, format_size};

/// Renders the end-of-job summary.
pub fn job_summary(account: &AccountProfile, result: &JobResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Archive job for {} ({})", account.display_name, account.id);
    let _ = writeln!(out, "  Duration:        {:.1}s", result.duration.as_secs_f64());
    let _ = writeln!(out, "  Folders checked: {}", result.folders_checked);
    if result.fetch_errors > 0 {
        let _ = writeln!(out, "  Folder errors:   {}", result.fetch_errors);
    }
    let _ = writeln!(out, "  Found:           {}", result.total_found);
    let _ = writeln!(out, "  Processed:       {}", result.processed);
    let _ = writeln!(out, "  Archived:        {}", result.archived);
    let _ = writeln!(out, "  Saved recent:    {}", result.saved_recent);
    let _ = writeln!(out, "  Errors:          {}", result.errors);

    match &result.status {
        JobStatus::Completed => {}
        JobStatus::NothingToDo => {
            let _ = writeln!(out, "Nothing to archive.");
        }
        JobStatus::Aborted(reason) => {
            let _ = writeln!(out, "Aborted: {reason}");
        }
    }
    out
}

/// Renders search hits, one per line.
pub fn search_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No matches.\n".to_string();
    }

    let mut out = String::new();
    for hit in hits {
        let _ = writeln!(
            out,
            "{:>3}%  {:<31}  {:>9}  {}",
            hit.score,
            hit.date.as_deref().unwrap_or("-"),
            format_size(hit.size),
            hit.subject
        );
        let _ = writeln!(out, "      {}", hit.path.display());
    }
    out
}

/// Renders the configured accounts.
pub fn accounts(profiles: &[AccountProfile]) -> String {
    if profiles.is_empty() {
        return "No accounts configured.\n".to_string();
    }

    let mut out = String::new();
    for profile in profiles {
        let _ = write!(
            out,
            "{}  <{}>  {} {}:{}",
            profile.display_name,
            profile.id,
            profile.protocol,
            profile.inbound_host,
            profile.inbound_port
        );
        if let Some(outbound) = &profile.outbound {
            let _ = write!(out, "  smtp {}:{}", outbound.host, outbound.port);
        }
        out.push('\n');
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
    use std::path::PathBuf;
    use std::time::Duration;

    use mailstash_core::Protocol;

    use super::*;

    fn account() -> AccountProfile {
        AccountProfile::new("Work", "anna@example.com", "imap.example.com", 993, Protocol::Imap)
    }

    #[test]
    fn test_summary_hides_zero_folder_errors() {
        let result = JobResult {
            total_found: 3,
            processed: 3,
            archived: 1,
            saved_recent: 2,
            folders_checked: 1,
            duration: Duration::from_millis(2500),
            ..JobResult::default()
        };
        let text = job_summary(&account(), &result);
        assert!(text.contains("Duration:        2.5s"));
        assert!(text.contains("Archived:        1"));
        assert!(text.contains("Saved recent:    2"));
        assert!(!text.contains("Folder errors"));
        assert!(!text.contains("Aborted"));
    }

    #[test]
    fn test_summary_aborted() {
        let result = JobResult {
            fetch_errors: 2,
            status: JobStatus::Aborted("Timed out: read".into()),
            ..JobResult::default()
        };
        let text = job_summary(&account(), &result);
        assert!(text.contains("Folder errors:   2"));
        assert!(text.ends_with("Aborted: Timed out: read\n"));
    }

    #[test]
    fn test_search_hits() {
        let hits = vec![SearchHit {
            path: PathBuf::from("/a/b.eml"),
            subject: "Invoice".into(),
            date: None,
            size: 2048,
            score: 92,
        }];
        let text = search_hits(&hits);
        assert!(text.starts_with(" 92%"));
        assert!(text.contains("2.0 KB"));
        assert!(text.contains("/a/b.eml"));
        assert_eq!(search_hits(&[]), "No matches.\n");
    }

    #[test]
    fn test_accounts() {
        let text = accounts(&[account().with_outbound("smtp.example.com", 465)]);
        assert_eq!(
            text,
            "Work  <anna@example.com>  IMAP imap.example.com:993  smtp smtp.example.com:465\n"
        );
    }
}

//! Job inputs, outputs and progress.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::account::AccountProfile;

/// Default age after which mail is filed under `archiv`.
pub const DEFAULT_AGE_THRESHOLD_DAYS: i64 = 30;

/// What to archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Account to read from.
    pub account: AccountProfile,
    /// Folders in processing order. Empty means the protocol default.
    pub folders: Vec<String>,
    /// Messages strictly older than this many days are archived.
    pub age_threshold_days: i64,
}

impl JobRequest {
    /// Creates a request for the default folder and threshold.
    #[must_use]
    pub const fn new(account: AccountProfile) -> Self {
        Self {
            account,
            folders: Vec::new(),
            age_threshold_days: DEFAULT_AGE_THRESHOLD_DAYS,
        }
    }

    /// Sets the folders to process.
    #[must_use]
    pub fn with_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the age threshold in days.
    #[must_use]
    pub const fn with_age_threshold(mut self, days: i64) -> Self {
        self.age_threshold_days = days;
        self
    }
}

/// How a job ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    /// Every pair was visited.
    #[default]
    Completed,
    /// Enumeration found no messages.
    NothingToDo,
    /// Enumeration or downloading stopped early; the reason is the session
    /// error.
    Aborted(String),
}

/// Counters of a finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// Messages found during enumeration.
    pub total_found: usize,
    /// Messages for which a fetch was attempted.
    pub processed: usize,
    /// Messages filed under `archiv`.
    pub archived: usize,
    /// Messages filed under `emails`.
    pub saved_recent: usize,
    /// Messages that could not be archived.
    pub errors: usize,
    /// Folders whose enumeration failed.
    pub fetch_errors: usize,
    /// Folders attempted during enumeration.
    pub folders_checked: usize,
    /// Wall-clock time of the job.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Terminal status.
    pub status: JobStatus,
}

impl JobResult {
    /// Messages written, in either category.
    #[must_use]
    pub const fn saved(&self) -> usize {
        self.archived + self.saved_recent
    }
}

/// Progress report sent while a job runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Human-readable phase description.
    pub status_text: String,
    /// Messages processed so far.
    pub processed: usize,
    /// Messages found so far.
    pub total: usize,
    /// Errors so far.
    pub errors: usize,
}

/// Serialises a [`Duration`] as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
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

    #[test]
    fn test_request_defaults() {
        let account = AccountProfile::new("A", "a@example.com", "h", 993, Protocol::Imap);
        let request = JobRequest::new(account).with_folders(["INBOX", "Sent"]);
        assert_eq!(request.folders, vec!["INBOX", "Sent"]);
        assert_eq!(request.age_threshold_days, DEFAULT_AGE_THRESHOLD_DAYS);
    }

    #[test]
    fn test_result_json_shape() {
        let result = JobResult {
            total_found: 3,
            processed: 3,
            archived: 1,
            saved_recent: 2,
            duration: Duration::from_millis(1500),
            ..JobResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalFound"], 3);
        assert_eq!(json["savedRecent"], 2);
        assert_eq!(json["fetchErrors"], 0);
        assert_eq!(json["duration"], 1.5);
        assert_eq!(json["status"], "completed");
        assert_eq!(result.saved(), 3);

        let back: JobResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_aborted_json() {
        let json = serde_json::to_value(JobStatus::Aborted("timeout".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "aborted": "timeout" }));
    }
}

//! The retrieval, classification and archival pipeline.
//!
//! A job runs in two phases on one task:
//!
//! 1. **Enumerate**: for each folder, select it and list message ids. A
//!    failing folder is counted in `fetch_errors` and skipped.
//! 2. **Archive**: fetch every `(folder, id)` pair, classify it by age and
//!    write it plus its attachments. A failing pair is counted in `errors`
//!    and skipped. A dropped connection is re-established once per pair; if
//!    that fails the phase stops and all unvisited pairs count as errors.
//!
//! POP3 message numbers are only meaningful within one session, so the
//! enumeration session is handed over to phase 2 instead of being closed.

mod model;

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, Utc};
use mailstash_mime::Message;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use model::{DEFAULT_AGE_THRESHOLD_DAYS, JobRequest, JobResult, JobStatus, ProgressSnapshot};

use crate::account::{AccountProfile, Protocol, SecretStore};
use crate::archive::{ArchiveWriter, extract_attachments, write_message};
use crate::classifier::{Category, classify, extract_date};
use crate::session::{MailSession, MessageId, SessionConnector, SessionError};
use crate::{Error, Result};

/// Archives the mail of one account per [`ArchivePipeline::run`] call.
pub struct ArchivePipeline<C> {
    connector: C,
    secrets: Arc<dyn SecretStore>,
    writer: ArchiveWriter,
}

impl<C: std::fmt::Debug> std::fmt::Debug for ArchivePipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchivePipeline")
            .field("connector", &self.connector)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl<C: SessionConnector> ArchivePipeline<C> {
    /// Creates a pipeline.
    pub fn new(connector: C, secrets: Arc<dyn SecretStore>, writer: ArchiveWriter) -> Self {
        Self {
            connector,
            secrets,
            writer,
        }
    }

    /// Archive layout in use.
    pub const fn writer(&self) -> &ArchiveWriter {
        &self.writer
    }

    /// Runs one job to completion.
    ///
    /// Per-folder and per-message failures are counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::Credential`] before any network
    /// I/O when the threshold is negative or the account has no secret.
    pub async fn run(
        &self,
        request: &JobRequest,
        progress: Option<&mpsc::Sender<ProgressSnapshot>>,
    ) -> Result<JobResult> {
        if request.age_threshold_days < 0 {
            return Err(Error::Config(format!(
                "age threshold must not be negative, got {}",
                request.age_threshold_days
            )));
        }
        let secret = self.resolve_secret(&request.account)?;
        let folders = effective_folders(&request.account, &request.folders);

        info!(
            account = %request.account.id,
            protocol = %request.account.protocol,
            folders = ?folders,
            threshold_days = request.age_threshold_days,
            "Archive job started"
        );

        let started = Instant::now();
        let mut job = Job {
            pipeline: self,
            request,
            secret,
            progress,
            result: JobResult::default(),
        };

        let (pairs, handoff) = job.enumerate(&folders).await;
        job.result.total_found = pairs.len();

        let aborted = matches!(job.result.status, JobStatus::Aborted(_));
        if aborted || pairs.is_empty() {
            if let Some(mut session) = handoff {
                session.close().await;
            }
            if !aborted {
                job.result.status = JobStatus::NothingToDo;
                job.report("Nothing to archive");
            }
        } else {
            job.archive(&pairs, handoff).await;
        }

        job.result.duration = started.elapsed();
        let result = job.result;
        info!(
            account = %request.account.id,
            found = result.total_found,
            archived = result.archived,
            recent = result.saved_recent,
            errors = result.errors,
            fetch_errors = result.fetch_errors,
            status = ?result.status,
            "Archive job finished"
        );
        Ok(result)
    }

    fn resolve_secret(&self, account: &AccountProfile) -> Result<String> {
        match self.secrets.get_secret(&account.id)? {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(Error::Config(format!("no password stored for {}", account.id))),
        }
    }
}

/// Folders a job will visit.
///
/// POP3 has exactly one; anything else requested is ignored. Blank names
/// are dropped and an empty list means the protocol default.
fn effective_folders(account: &AccountProfile, requested: &[String]) -> Vec<String> {
    let default = account.protocol.default_folder();
    let named: Vec<String> = requested
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    match account.protocol {
        Protocol::Pop3 => {
            if named.iter().any(|f| f != default) {
                warn!(requested = ?named, "POP3 has a single folder, using {default:?}");
            }
            vec![default.to_string()]
        }
        Protocol::Imap if named.is_empty() => vec![default.to_string()],
        Protocol::Imap => named,
    }
}

/// State of one running job.
struct Job<'a, C: SessionConnector> {
    pipeline: &'a ArchivePipeline<C>,
    request: &'a JobRequest,
    secret: String,
    progress: Option<&'a mpsc::Sender<ProgressSnapshot>>,
    result: JobResult,
}

impl<C: SessionConnector> Job<'_, C> {
    fn account(&self) -> &AccountProfile {
        &self.request.account
    }

    /// Sends a snapshot if there is room; never waits.
    fn report(&self, status_text: impl Into<String>) {
        let Some(tx) = self.progress else {
            return;
        };
        let snapshot = ProgressSnapshot {
            status_text: status_text.into(),
            processed: self.result.processed,
            total: self.result.total_found,
            errors: self.result.errors,
        };
        if tx.try_send(snapshot).is_err() {
            debug!("Progress channel full or closed, snapshot dropped");
        }
    }

    /// Connects and logs in.
    async fn open_session(&self) -> std::result::Result<C::Session, SessionError> {
        let account = self.account();
        let mut session = self.pipeline.connector.connect(account).await?;
        if let Err(e) = session.authenticate(&account.id, &self.secret).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Phase 1. Returns the pairs in folder order, plus the POP3 session to
    /// reuse for phase 2.
    async fn enumerate(
        &mut self,
        folders: &[String],
    ) -> (Vec<(String, MessageId)>, Option<C::Session>) {
        self.report("Enumerating folders");

        let mut pairs = Vec::new();
        let mut session: Option<C::Session> = None;

        for (index, folder) in folders.iter().enumerate() {
            self.result.folders_checked += 1;

            if !session.as_ref().is_some_and(MailSession::is_connected) {
                session = match self.open_session().await {
                    Ok(fresh) => Some(fresh),
                    Err(e) if is_fatal(&e) => {
                        warn!(folder = %folder, error = %e, "Cannot log in, stopping enumeration");
                        self.result.fetch_errors += folders.len() - index;
                        self.result.status = JobStatus::Aborted(e.to_string());
                        self.report("Aborted");
                        break;
                    }
                    Err(e) => {
                        warn!(folder = %folder, error = %e, "Cannot open session for folder");
                        self.result.fetch_errors += 1;
                        self.report(format!("Folder {folder} failed"));
                        continue;
                    }
                };
            }
            let Some(live) = session.as_mut() else {
                continue;
            };

            match list_folder(live, folder).await {
                Ok(ids) => {
                    info!(folder = %folder, count = ids.len(), "Folder enumerated");
                    pairs.extend(ids.into_iter().map(|id| (folder.clone(), id)));
                }
                Err(e) => {
                    warn!(folder = %folder, error = %e, "Folder enumeration failed");
                    self.result.fetch_errors += 1;
                }
            }
            self.result.total_found = pairs.len();
            self.report(format!("Checked folder {folder}"));
        }

        let handoff = match (self.account().protocol, session) {
            (Protocol::Pop3, session) => session,
            (Protocol::Imap, Some(mut session)) => {
                session.close().await;
                None
            }
            (Protocol::Imap, None) => None,
        };
        (pairs, handoff)
    }

    /// Phase 2.
    async fn archive(&mut self, pairs: &[(String, MessageId)], handoff: Option<C::Session>) {
        self.report(format!("Archiving {} messages", pairs.len()));

        let reusable = handoff.filter(MailSession::is_connected);
        let mut session = match reusable {
            Some(session) => session,
            None => match self.open_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "Cannot open download session");
                    self.abort(pairs.len(), &e);
                    return;
                }
            },
        };

        let mut current_folder: Option<&str> = None;

        for (index, (folder, id)) in pairs.iter().enumerate() {
            if !session.is_connected() {
                info!("Connection lost, reconnecting");
                match self.open_session().await {
                    Ok(fresh) => {
                        session = fresh;
                        current_folder = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "Reconnect failed, stopping");
                        self.abort(pairs.len() - index, &e);
                        break;
                    }
                }
            }

            if current_folder != Some(folder.as_str()) {
                if let Err(e) = session.select_folder(folder).await {
                    warn!(folder = %folder, id = %id, error = %e, "Cannot select folder");
                    self.result.errors += 1;
                    current_folder = None;
                    self.report(format!("Folder {folder} unavailable"));
                    continue;
                }
                current_folder = Some(folder.as_str());
            }

            self.result.processed += 1;
            match self.archive_one(&mut session, folder, id).await {
                Ok(Category::Archive) => self.result.archived += 1,
                Ok(Category::Recent) => self.result.saved_recent += 1,
                Err(e) => {
                    warn!(folder = %folder, id = %id, error = %e, "Message not archived");
                    self.result.errors += 1;
                }
            }
            self.report(format!("Processed {}/{}", self.result.processed, pairs.len()));
        }

        session.close().await;
    }

    fn abort(&mut self, remaining: usize, error: &SessionError) {
        self.result.errors += remaining;
        self.result.status = JobStatus::Aborted(error.to_string());
        self.report("Aborted");
    }

    /// Fetches, classifies and writes one message.
    async fn archive_one(
        &self,
        session: &mut C::Session,
        folder: &str,
        id: &MessageId,
    ) -> Result<Category> {
        let raw = session.fetch_raw(id).await?;
        let message = Message::parse(&raw)?;

        let now = Local::now();
        let date = message.date().and_then(extract_date);
        let category = classify(
            date.as_ref(),
            self.request.age_threshold_days,
            now.with_timezone(&Utc),
        );

        let dir = self
            .pipeline
            .writer
            .storage_path(self.account(), category, folder, now.date_naive());
        fs::create_dir_all(&dir).map_err(|e| Error::filesystem(&dir, e))?;

        let subject = message.subject();
        let path = write_message(
            &dir,
            &raw,
            subject.as_deref(),
            date.as_ref(),
            message.message_id(),
            &now,
        )?;
        let attachments = extract_attachments(&message, &dir, &now);
        debug!(path = %path.display(), ?category, attachments, "Message archived");

        Ok(category)
    }
}

/// Failures that will recur for every folder: bad credentials or an
/// unreachable server.
const fn is_fatal(error: &SessionError) -> bool {
    matches!(error, SessionError::Authentication(_)) || error.is_connection_level()
}

/// Selects `folder` and lists its ids.
async fn list_folder<S: MailSession>(
    session: &mut S,
    folder: &str,
) -> std::result::Result<Vec<MessageId>, SessionError> {
    session.select_folder(folder).await?;
    session.list_message_ids().await
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

    fn account(protocol: Protocol) -> AccountProfile {
        AccountProfile::new("A", "a@example.com", "h", 993, protocol)
    }

    #[test]
    fn test_imap_default_folder() {
        assert_eq!(effective_folders(&account(Protocol::Imap), &[]), vec!["INBOX"]);
    }

    #[test]
    fn test_imap_blank_names_dropped() {
        let requested = vec![" Sent ".to_string(), String::new(), "INBOX".to_string()];
        assert_eq!(effective_folders(&account(Protocol::Imap), &requested), vec!["Sent", "INBOX"]);
    }

    #[test]
    fn test_pop3_forced_to_inbox() {
        let requested = vec!["Sent".to_string(), "Archive".to_string()];
        assert_eq!(effective_folders(&account(Protocol::Pop3), &requested), vec!["inbox"]);
        assert_eq!(effective_folders(&account(Protocol::Pop3), &[]), vec!["inbox"]);
    }
}

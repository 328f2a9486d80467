//! End-to-end pipeline tests against an in-memory mail server.

#![allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, Utc};
use mailstash_core::{
    AccountProfile, ArchivePipeline, ArchiveWriter, Error, InMemorySecretStore, JobRequest,
    JobRunner, JobStatus, MailSession, MessageId, Protocol, SessionConnector, SessionError,
    SessionState, list_folders,
};
use walkdir::WalkDir;

const SECRET: &str = "pw";

#[derive(Debug, Default)]
struct Mailbox {
    folders: Vec<(String, Vec<(String, Vec<u8>)>)>,
    failing_folders: HashSet<String>,
    timeouts: HashSet<String>,
}

impl Mailbox {
    fn folder(mut self, name: &str, messages: Vec<(&str, Vec<u8>)>) -> Self {
        let messages = messages.into_iter().map(|(id, raw)| (id.to_string(), raw)).collect();
        self.folders.push((name.to_string(), messages));
        self
    }

    fn failing(mut self, folder: &str) -> Self {
        self.failing_folders.insert(folder.to_string());
        self
    }

    fn timeout_on(mut self, id: &str) -> Self {
        self.timeouts.insert(id.to_string());
        self
    }

    fn messages(&self, folder: &str) -> Option<&Vec<(String, Vec<u8>)>> {
        self.folders.iter().find(|(name, _)| name == folder).map(|(_, m)| m)
    }
}

#[derive(Debug, Clone)]
struct FakeConnector {
    mailbox: Arc<Mailbox>,
    connects: Arc<AtomicUsize>,
    max_connects: usize,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox: Arc::new(mailbox),
            connects: Arc::new(AtomicUsize::new(0)),
            max_connects: usize::MAX,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_max_connects(mut self, max: usize) -> Self {
        self.max_connects = max;
        self
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl SessionConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, _account: &AccountProfile) -> Result<FakeSession, SessionError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst);
        if n >= self.max_connects {
            return Err(SessionError::Refused("connection refused".into()));
        }
        self.log.lock().unwrap().push("connect".into());
        Ok(FakeSession {
            mailbox: Arc::clone(&self.mailbox),
            state: SessionState::Connected,
            folder: None,
            log: Arc::clone(&self.log),
        })
    }
}

#[derive(Debug)]
struct FakeSession {
    mailbox: Arc<Mailbox>,
    state: SessionState,
    folder: Option<String>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeSession {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn require_folder(&self) -> Result<&Vec<(String, Vec<u8>)>, SessionError> {
        if self.state != SessionState::FolderSelected {
            return Err(SessionError::Protocol(format!("no folder in {:?}", self.state)));
        }
        let folder = self.folder.as_deref().unwrap_or_default();
        self.mailbox
            .messages(folder)
            .ok_or_else(|| SessionError::Protocol("folder vanished".into()))
    }
}

impl MailSession for FakeSession {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn authenticate(&mut self, _user: &str, secret: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::Protocol("not connected".into()));
        }
        if secret != SECRET {
            return Err(SessionError::Authentication("invalid credentials".into()));
        }
        self.state = SessionState::Authenticated;
        Ok(())
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), SessionError> {
        self.record(format!("select {name}"));
        if !matches!(self.state, SessionState::Authenticated | SessionState::FolderSelected) {
            return Err(SessionError::Protocol("not authenticated".into()));
        }
        if self.mailbox.failing_folders.contains(name) || self.mailbox.messages(name).is_none() {
            self.state = SessionState::Authenticated;
            self.folder = None;
            return Err(SessionError::Protocol(format!("no such folder {name}")));
        }
        self.state = SessionState::FolderSelected;
        self.folder = Some(name.to_string());
        Ok(())
    }

    async fn list_message_ids(&mut self) -> Result<Vec<MessageId>, SessionError> {
        let messages = self.require_folder()?;
        Ok(messages.iter().map(|(id, _)| MessageId::new(id.as_str())).collect())
    }

    async fn fetch_raw(&mut self, id: &MessageId) -> Result<Vec<u8>, SessionError> {
        self.record(format!("fetch {id}"));
        if self.mailbox.timeouts.contains(id.as_str()) {
            self.state = SessionState::Disconnected;
            return Err(SessionError::Timeout("read timed out".into()));
        }
        let messages = self.require_folder()?;
        messages
            .iter()
            .find(|(candidate, _)| candidate == id.as_str())
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| SessionError::Protocol(format!("no message {id}")))
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        Ok(self.mailbox.folders.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn close(&mut self) {
        self.record("close".into());
        self.state = SessionState::Disconnected;
        self.folder = None;
    }
}

fn account(protocol: Protocol) -> AccountProfile {
    let port = if protocol == Protocol::Imap { 993 } else { 995 };
    AccountProfile::new("Work", "anna@example.com", "mail.example.com", port, protocol)
}

fn mail(subject: &str, age_days: Option<i64>, message_id: &str) -> Vec<u8> {
    let mut raw = format!("Subject: {subject}\r\nMessage-ID: {message_id}\r\n");
    if let Some(days) = age_days {
        let date = Utc::now() - TimeDelta::days(days);
        raw.push_str(&format!("Date: {}\r\n", date.to_rfc2822()));
    }
    raw.push_str("\r\nHello\r\n");
    raw.into_bytes()
}

fn pipeline(connector: FakeConnector, root: &Path) -> ArchivePipeline<FakeConnector> {
    ArchivePipeline::new(
        connector,
        Arc::new(InMemorySecretStore::with_secret("anna@example.com", SECRET)),
        ArchiveWriter::new(root),
    )
}

fn eml_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|e| e == "eml"))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_messages_split_by_age() {
    let root = tempfile::tempdir().unwrap();
    let old = mail("Old", Some(45), "<old@x>");
    let connector = FakeConnector::new(Mailbox::default().folder(
        "INBOX",
        vec![
            ("1", old.clone()),
            ("2", mail("New", Some(10), "<new@x>")),
            ("3", mail("Undated", None, "<u@x>")),
        ],
    ));

    let request = JobRequest::new(account(Protocol::Imap)).with_age_threshold(30);
    let result = pipeline(connector, root.path()).run(&request, None).await.unwrap();

    assert_eq!(result.total_found, 3);
    assert_eq!(result.processed, 3);
    assert_eq!(result.archived, 1);
    assert_eq!(result.saved_recent, 2);
    assert_eq!(result.errors, 0);
    assert_eq!(result.status, JobStatus::Completed);

    let archived = eml_files(&root.path().join("Work/archiv/INBOX"));
    assert_eq!(archived.len(), 1);
    assert_eq!(std::fs::read(&archived[0]).unwrap(), old);
    assert_eq!(eml_files(&root.path().join("Work/emails/INBOX")).len(), 2);
}

#[tokio::test]
async fn test_fetch_timeout_skips_one_message() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(
        Mailbox::default()
            .folder(
                "INBOX",
                vec![
                    ("41", mail("a", Some(1), "<a@x>")),
                    ("42", mail("b", Some(1), "<b@x>")),
                    ("43", mail("c", Some(1), "<c@x>")),
                ],
            )
            .timeout_on("42"),
    );

    let request = JobRequest::new(account(Protocol::Imap));
    let result = pipeline(connector.clone(), root.path()).run(&request, None).await.unwrap();

    assert_eq!(result.processed, 3);
    assert_eq!(result.errors, 1);
    assert_eq!(result.saved_recent, 2);
    assert_eq!(result.status, JobStatus::Completed);

    // enumeration, download, and one reconnect after the timeout
    assert_eq!(connector.connects(), 3);
    let log = connector.log();
    let after_timeout: Vec<&str> = log
        .iter()
        .skip_while(|e| *e != "fetch 42")
        .map(String::as_str)
        .collect();
    assert_eq!(after_timeout, vec!["fetch 42", "connect", "select INBOX", "fetch 43", "close"]);
}

#[tokio::test]
async fn test_reconnect_failure_aborts_remaining() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(
        Mailbox::default()
            .folder(
                "INBOX",
                vec![
                    ("1", mail("a", Some(1), "<1@x>")),
                    ("2", mail("b", Some(1), "<2@x>")),
                    ("3", mail("c", Some(1), "<3@x>")),
                    ("4", mail("d", Some(1), "<4@x>")),
                ],
            )
            .timeout_on("2"),
    )
    .with_max_connects(2);

    let request = JobRequest::new(account(Protocol::Imap));
    let result = pipeline(connector, root.path()).run(&request, None).await.unwrap();

    assert_eq!(result.total_found, 4);
    assert_eq!(result.processed, 2);
    assert_eq!(result.saved_recent, 1);
    assert_eq!(result.errors, 3);
    assert!(matches!(result.status, JobStatus::Aborted(ref reason) if reason.contains("refused")));
}

#[tokio::test]
async fn test_download_connect_failure_counts_everything() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(
        Mailbox::default().folder(
            "INBOX",
            vec![("1", mail("a", Some(1), "<1@x>")), ("2", mail("b", Some(1), "<2@x>"))],
        ),
    )
    .with_max_connects(1);

    let request = JobRequest::new(account(Protocol::Imap));
    let result = pipeline(connector, root.path()).run(&request, None).await.unwrap();

    assert_eq!(result.processed, 0);
    assert_eq!(result.errors, 2);
    assert!(matches!(result.status, JobStatus::Aborted(_)));
}

#[tokio::test]
async fn test_wrong_password_logs_in_once() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(
        Mailbox::default()
            .folder("INBOX", vec![("1", mail("a", Some(1), "<1@x>"))])
            .folder("Sent", vec![])
            .folder("Archive", vec![]),
    );
    let pipeline = ArchivePipeline::new(
        connector.clone(),
        Arc::new(InMemorySecretStore::with_secret("anna@example.com", "not-the-password")),
        ArchiveWriter::new(root.path()),
    );

    let request =
        JobRequest::new(account(Protocol::Imap)).with_folders(["INBOX", "Sent", "Archive"]);
    let result = pipeline.run(&request, None).await.unwrap();

    assert_eq!(connector.connects(), 1);
    assert_eq!(result.folders_checked, 1);
    assert_eq!(result.fetch_errors, 3);
    assert_eq!(result.processed, 0);
    assert!(matches!(
        result.status,
        JobStatus::Aborted(ref reason) if reason.contains("invalid credentials")
    ));
    assert!(!connector.log().iter().any(|e| e.starts_with("select")));
}

#[tokio::test]
async fn test_unreachable_server_aborts_enumeration() {
    let root = tempfile::tempdir().unwrap();
    let connector =
        FakeConnector::new(Mailbox::default().folder("INBOX", vec![]).folder("Sent", vec![]))
            .with_max_connects(0);

    let request = JobRequest::new(account(Protocol::Imap)).with_folders(["INBOX", "Sent"]);
    let result = pipeline(connector.clone(), root.path()).run(&request, None).await.unwrap();

    assert_eq!(connector.connects(), 1);
    assert_eq!(result.fetch_errors, 2);
    assert!(matches!(result.status, JobStatus::Aborted(ref reason) if reason.contains("refused")));
}

#[tokio::test]
async fn test_failing_folder_is_isolated() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(
        Mailbox::default()
            .folder("INBOX", vec![("1", mail("a", Some(1), "<1@x>"))])
            .folder("Broken", vec![("1", mail("b", Some(1), "<2@x>"))])
            .folder("Archive/2023", vec![("1", mail("c", Some(400), "<3@x>"))])
            .failing("Broken"),
    );

    let request =
        JobRequest::new(account(Protocol::Imap)).with_folders(["INBOX", "Broken", "Archive/2023"]);
    let result = pipeline(connector.clone(), root.path()).run(&request, None).await.unwrap();

    assert_eq!(result.folders_checked, 3);
    assert_eq!(result.fetch_errors, 1);
    assert_eq!(result.total_found, 2);
    assert_eq!(result.archived, 1);
    assert_eq!(result.saved_recent, 1);
    assert_eq!(result.errors, 0);
    assert_eq!(eml_files(&root.path().join("Work/archiv/Archive__2023")).len(), 1);

    // one enumeration session survives the failing folder
    assert_eq!(connector.connects(), 2);
}

#[tokio::test]
async fn test_same_name_attachments() {
    let raw = b"Subject: Reports\r\n\
Message-ID: <r@x>\r\n\
Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
\r\n\
--XX\r\n\
Content-Type: text/plain\r\n\
\r\n\
Two reports.\r\n\
--XX\r\n\
Content-Type: application/pdf\r\n\
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
--XX--\r\n"
        .to_vec();
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(Mailbox::default().folder("INBOX", vec![("1", raw)]));

    let request = JobRequest::new(account(Protocol::Imap));
    let result = pipeline(connector, root.path()).run(&request, None).await.unwrap();
    assert_eq!(result.saved_recent, 1);

    let mut names: Vec<String> = WalkDir::new(root.path())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().parent().is_some_and(|p| p.ends_with("anhänge")))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["report.pdf", "report_1.pdf"]);
}

#[tokio::test]
async fn test_missing_secret_is_config_error() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(Mailbox::default().folder("INBOX", vec![]));
    let pipeline = ArchivePipeline::new(
        connector.clone(),
        Arc::new(InMemorySecretStore::new()),
        ArchiveWriter::new(root.path()),
    );

    let err = pipeline.run(&JobRequest::new(account(Protocol::Imap)), None).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.is_config());
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_negative_threshold_is_config_error() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(Mailbox::default());
    let request = JobRequest::new(account(Protocol::Imap)).with_age_threshold(-1);

    let err = pipeline(connector.clone(), root.path()).run(&request, None).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_empty_folder_is_nothing_to_do() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(Mailbox::default().folder("INBOX", vec![]));

    let result = pipeline(connector.clone(), root.path())
        .run(&JobRequest::new(account(Protocol::Imap)), None)
        .await
        .unwrap();
    assert_eq!(result.status, JobStatus::NothingToDo);
    assert_eq!(result.total_found, 0);
    assert_eq!(connector.log().last().map(String::as_str), Some("close"));
    assert!(!root.path().exists() || eml_files(root.path()).is_empty());
}

#[tokio::test]
async fn test_pop3_reuses_enumeration_session() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(
        Mailbox::default().folder(
            "inbox",
            vec![("1", mail("a", Some(90), "<1@x>")), ("2", mail("b", Some(2), "<2@x>"))],
        ),
    );

    let request = JobRequest::new(account(Protocol::Pop3)).with_folders(["Sent"]);
    let result = pipeline(connector.clone(), root.path()).run(&request, None).await.unwrap();

    assert_eq!(result.archived, 1);
    assert_eq!(result.saved_recent, 1);
    assert_eq!(connector.connects(), 1);
    assert_eq!(eml_files(&root.path().join("Work/archiv/inbox")).len(), 1);
}

#[tokio::test]
async fn test_runner_reports_progress() {
    let root = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new(Mailbox::default().folder(
        "INBOX",
        vec![
            ("1", mail("a", Some(1), "<1@x>")),
            ("2", mail("b", Some(1), "<2@x>")),
            ("3", mail("c", Some(1), "<3@x>")),
        ],
    ));

    let mut handle = JobRunner::spawn(
        Arc::new(pipeline(connector, root.path())),
        JobRequest::new(account(Protocol::Imap)),
    );

    let mut snapshots = Vec::new();
    while let Some(snapshot) = handle.next_progress().await {
        snapshots.push(snapshot);
    }
    let result = handle.wait().await.unwrap();

    assert_eq!(result.saved_recent, 3);
    assert_eq!(snapshots.first().unwrap().status_text, "Enumerating folders");
    let last = snapshots.last().unwrap();
    assert_eq!((last.processed, last.total, last.errors), (3, 3, 0));
}

#[tokio::test]
async fn test_list_folders_sorted() {
    let connector = FakeConnector::new(
        Mailbox::default()
            .folder("sent", vec![])
            .folder("INBOX", vec![])
            .folder("Archive", vec![]),
    );

    let folders = list_folders(&connector, &account(Protocol::Imap), SECRET).await.unwrap();
    assert_eq!(folders, vec!["Archive", "INBOX", "sent"]);
    assert_eq!(connector.log().last().map(String::as_str), Some("close"));

    let err = list_folders(&connector, &account(Protocol::Imap), "wrong").await.unwrap_err();
    assert!(matches!(err, SessionError::Authentication(_)));
}

#[tokio::test]
async fn test_list_folders_pop3_without_connecting() {
    let connector = FakeConnector::new(Mailbox::default());
    let folders = list_folders(&connector, &account(Protocol::Pop3), SECRET).await.unwrap();
    assert_eq!(folders, vec!["inbox"]);
    assert_eq!(connector.connects(), 0);
}

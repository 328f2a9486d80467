//! # mailstash-core
//!
//! Retrieval, classification and archival of mail for `mailstash`.
//!
//! This crate provides:
//! - **Accounts**: profiles, the plain-text accounts file, keyring secrets
//! - **Sessions**: one state machine over IMAP and POP3 connections
//! - **Classification**: Date header parsing and age categories
//! - **Archive**: deterministic, collision-safe `.eml` and attachment files
//! - **Pipeline**: two-phase jobs with per-folder and per-message isolation
//! - **Runner**: jobs on a tokio task with a bounded progress channel
//! - **Search**: fuzzy search over the archive
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mailstash_core::{
//!     ArchivePipeline, ArchiveWriter, JobRequest, JobRunner, KeyringSecretStore, NetworkConnector,
//! };
//!
//! let pipeline = Arc::new(ArchivePipeline::new(
//!     NetworkConnector::default(),
//!     Arc::new(KeyringSecretStore::new()),
//!     ArchiveWriter::default(),
//! ));
//! let mut job = JobRunner::spawn(pipeline, JobRequest::new(account).with_age_threshold(30));
//! while let Some(snapshot) = job.next_progress().await {
//!     println!("{} ({}/{})", snapshot.status_text, snapshot.processed, snapshot.total);
//! }
//! let result = job.wait().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod archive;
pub mod classifier;
mod error;
mod folders;
pub mod pipeline;
mod runner;
pub mod search;
pub mod session;

pub use account::credentials;
pub use account::{
    AccountProfile, AccountStore, CredentialError, CredentialResult, InMemorySecretStore,
    KeyringSecretStore, OutboundServer, Protocol, SecretStore, ValidationError, ValidationResult,
    resolve_accounts_path, validate_profile,
};
pub use archive::ArchiveWriter;
pub use classifier::{Category, classify, extract_date};
pub use error::{Error, Result};
pub use folders::list_folders;
pub use pipeline::{ArchivePipeline, JobRequest, JobResult, JobStatus, ProgressSnapshot};
pub use runner::{JobHandle, JobRunner, PROGRESS_CAPACITY};
pub use search::{SearchHit, format_size, search_archive};
pub use session::{
    MailSession, MessageId, NetworkConnector, RemoteSession, SessionConfig, SessionConnector,
    SessionError, SessionState, TlsMode,
};

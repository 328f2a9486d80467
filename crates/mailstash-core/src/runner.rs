//! Background execution of archive jobs.
//!
//! The runner does not lock accounts. Two jobs for the same account would
//! race on the archive directories and, for POP3, on the server's maildrop
//! lock, so callers must run at most one job per account at a time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pipeline::{ArchivePipeline, JobRequest, JobResult, ProgressSnapshot};
use crate::session::SessionConnector;
use crate::{Error, Result};

/// Capacity of the progress channel. Snapshots beyond it are dropped.
pub const PROGRESS_CAPACITY: usize = 32;

/// Spawns archive jobs on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobRunner;

impl JobRunner {
    /// Starts `request` on a new task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<C>(pipeline: Arc<ArchivePipeline<C>>, request: JobRequest) -> JobHandle
    where
        C: SessionConnector + 'static,
    {
        let (tx, rx) = mpsc::channel(PROGRESS_CAPACITY);
        let task = tokio::spawn(async move { pipeline.run(&request, Some(&tx)).await });
        JobHandle { progress: rx, task }
    }
}

/// A running job.
#[derive(Debug)]
pub struct JobHandle {
    progress: mpsc::Receiver<ProgressSnapshot>,
    task: JoinHandle<Result<JobResult>>,
}

impl JobHandle {
    /// Waits for the next progress snapshot.
    ///
    /// Returns `None` once the job has finished and all snapshots were read.
    pub async fn next_progress(&mut self) -> Option<ProgressSnapshot> {
        self.progress.recv().await
    }

    /// Waits for the job to finish.
    ///
    /// # Errors
    ///
    /// Returns the job's configuration error, or [`Error::Worker`] if the
    /// task panicked.
    pub async fn wait(self) -> Result<JobResult> {
        self.task.await.map_err(|e| Error::Worker(e.to_string()))?
    }
}

use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle of one transcription job.
/// Queued -> Running -> {Succeeded, Failed, Cancelled}; the three
/// right-hand states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// One (file, provider, format) unit of work. Owned by the orchestrator;
/// every mutation goes through the batch mutex.
#[derive(Debug)]
pub(crate) struct JobRecord {
    pub id: String,
    pub source: PathBuf,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(source: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
        }
    }

    /// Apply a state transition. Terminal states are final; an attempt to
    /// leave one is a bug elsewhere and is dropped.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(
                "job {}: ignoring transition {:?} -> {:?}",
                self.id,
                self.status,
                next
            );
            return false;
        }
        self.status = next;
        true
    }

    /// Record a progress update. Only advances (monotonic) and only while
    /// Running; returns whether anything changed.
    pub fn bump_progress(&mut self, percent: u8) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        let percent = percent.min(100);
        if percent > self.progress {
            self.progress = percent;
            true
        } else {
            false
        }
    }

    /// Progress with terminal jobs counted as complete, for batch-level
    /// aggregation.
    pub fn effective_progress(&self) -> u8 {
        if self.status.is_terminal() {
            100
        } else {
            self.progress
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            source: self.source.clone(),
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Consistent point-in-time copy of a job, safe to hand to observers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub source: PathBuf,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
}

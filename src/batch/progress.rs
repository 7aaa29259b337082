use super::job::{JobRecord, JobSnapshot, JobStatus};
use serde::Serialize;

/// Observer stream item. Delivery is serialized per job; which worker a
/// given event originates from is unspecified.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchEvent {
    #[serde(rename_all = "camelCase")]
    Progress { job_id: String, percent: u8 },
    #[serde(rename_all = "camelCase")]
    Finished {
        job_id: String,
        status: JobStatus,
        result: Option<String>,
        error: Option<String>,
    },
}

/// Final batch report: every job with its terminal state, plus counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub jobs: Vec<JobSnapshot>,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub(crate) fn from_jobs(jobs: &[JobRecord]) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        for job in jobs {
            match job.status {
                JobStatus::Succeeded => succeeded += 1,
                JobStatus::Failed => failed += 1,
                JobStatus::Cancelled => cancelled += 1,
                JobStatus::Queued | JobStatus::Running => {}
            }
        }
        Self {
            jobs: jobs.iter().map(|j| j.snapshot()).collect(),
            succeeded,
            failed,
            cancelled,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Status of a background generation job, polled through `/api/jobs/{job_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Percentage of rows attempted so far.
    InProgress(u32),
    Completed(String),
    Failed(String),
    Cancelled(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed(_) | JobStatus::Failed(_) | JobStatus::Cancelled(_)
        )
    }
}

//! State of background generation jobs.
//!
//! - `JobsState`: clonable handle injected as `web::Data`. Holds the status of
//!   every job and the cancellation token of every job still running.
//! - `JobUpdate`: a status change pushed by a worker through `JobsState.tx`.
//! - `start_job_updater`: the single consumer applying `JobUpdate`s.

use common::jobs::JobStatus;
use log::debug;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone)]
pub struct JobsState {
    /// Job id -> latest status. Written only by `start_job_updater` once a
    /// job is registered.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Job id -> token of a job that has not finished yet.
    pub cancels: Arc<RwLock<HashMap<String, CancellationToken>>>,

    pub tx: mpsc::Sender<JobUpdate>,
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    pub fn new(tx: mpsc::Sender<JobUpdate>) -> Self {
        JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancels: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }

    /// Registers a new `Pending` job and returns its id and token.
    pub async fn register(&self) -> (String, CancellationToken) {
        let job_id = Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), JobStatus::Pending);
        self.cancels
            .write()
            .await
            .insert(job_id.clone(), token.clone());
        (job_id, token)
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Signals a running job to stop. `false` when the job is unknown or
    /// already finished.
    pub async fn cancel(&self, job_id: &str) -> bool {
        match self.cancels.read().await.get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Applies updates until every sender is dropped. A finished status also
/// drops the job's cancellation token.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        debug!("Job {} -> {:?}", update.job_id, update.status);
        if update.status.is_finished() {
            state.cancels.write().await.remove(&update.job_id);
        }
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id, update.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_for(state: &JobsState, job_id: &str, expected: &JobStatus) -> bool {
        for _ in 0..100 {
            if state.status(job_id).await.as_ref() == Some(expected) {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    #[actix_web::test]
    async fn updates_flow_through_the_channel() {
        let (tx, rx) = mpsc::channel(8);
        let state = JobsState::new(tx);
        tokio::spawn(start_job_updater(state.clone(), rx));

        let (job_id, token) = state.register().await;
        assert_eq!(state.status(&job_id).await, Some(JobStatus::Pending));

        state
            .tx
            .send(JobUpdate {
                job_id: job_id.clone(),
                status: JobStatus::InProgress(50),
            })
            .await
            .unwrap();
        assert!(wait_for(&state, &job_id, &JobStatus::InProgress(50)).await);
        assert!(state.cancel(&job_id).await);

        let done = JobStatus::Cancelled("stopped".into());
        state
            .tx
            .send(JobUpdate {
                job_id: job_id.clone(),
                status: done.clone(),
            })
            .await
            .unwrap();
        assert!(wait_for(&state, &job_id, &done).await);
        assert!(token.is_cancelled());
        assert!(!state.cancel(&job_id).await);
    }

    #[actix_web::test]
    async fn cancel_flags_the_token() {
        let (tx, _rx) = mpsc::channel(8);
        let state = JobsState::new(tx);
        let (job_id, token) = state.register().await;
        assert!(state.cancel(&job_id).await);
        assert!(token.is_cancelled());
        assert!(!state.cancel("missing").await);
        assert_eq!(state.status("missing").await, None);
    }
}

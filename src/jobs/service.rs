//! Submission and status API in front of the job queue

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::ReconcilerConfig;
use crate::jobs::{Job, JobQueue, JobStatusView};
use crate::traits::{JobRunner, JobStore};
use crate::types::*;
use crate::utils::validation::validate_submission;

/// Validating front door for callers that submit and poll jobs
pub struct ReconciliationService<S: JobStore, R: JobRunner> {
    queue: JobQueue<S, R>,
    config: ReconcilerConfig,
}

impl<S: JobStore, R: JobRunner> ReconciliationService<S, R> {
    pub fn new(queue: JobQueue<S, R>, config: ReconcilerConfig) -> Self {
        Self { queue, config }
    }

    pub fn queue(&self) -> &JobQueue<S, R> {
        &self.queue
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Validate and enqueue a reconciliation request
    ///
    /// Invalid requests are rejected before a job is created.
    pub async fn submit_job(
        &self,
        date_start: NaiveDate,
        date_end: NaiveDate,
        concurrency: i64,
    ) -> ReconResult<Uuid> {
        let concurrency = validate_submission(date_start, date_end, concurrency, &self.config)
            .inspect_err(|err| tracing::warn!(error = %err, "job submission rejected"))?;
        self.queue.submit(date_start, date_end, concurrency).await
    }

    /// Status of every job, oldest first
    pub async fn list_jobs(&self) -> ReconResult<Vec<JobStatusView>> {
        let jobs = self.queue.list_jobs().await?;
        Ok(jobs.iter().map(JobStatusView::from).collect())
    }

    /// Full record of a single job
    pub async fn get_job(&self, id: Uuid) -> ReconResult<Job> {
        self.queue.get_job(id).await
    }
}

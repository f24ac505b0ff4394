//! Traits for the collaborators the reconciliation core talks to

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::jobs::{Job, JobArtifacts};
use crate::types::*;

/// Source of the two record sets for a date range
///
/// Implementations may read flat files, a database, or anything else. Any
/// error aborts the job before reduction starts, so partial results must not
/// be returned.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load internal ledger transactions whose date falls in `[start, end]`
    async fn load_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconResult<Vec<Transaction>>;

    /// Load bank statement lines dated in `[start, end]`
    async fn load_bank_statements(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconResult<Vec<BankStatement>>;
}

/// Destination for reconciliation output
///
/// Each write returns the location the artifact can be fetched from.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist the unmatched records of a run
    async fn write_unmatched(
        &self,
        results: &[UnmatchedResult],
        destination_id: &str,
    ) -> ReconResult<String>;

    /// Persist the summary of a run
    async fn write_summary(
        &self,
        summary: &ReconciliationSummary,
        destination_id: &str,
    ) -> ReconResult<String>;
}

/// Storage for submitted jobs
///
/// The store is shared between the submission path and the scheduler, so
/// every method must be safe to call concurrently.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Fails with `DuplicateJob` if the id is taken.
    async fn insert_job(&self, job: Job) -> ReconResult<()>;

    /// Get a job by id
    async fn get_job(&self, id: Uuid) -> ReconResult<Option<Job>>;

    /// Snapshot of every job, terminal ones included, ordered by creation
    async fn list_jobs(&self) -> ReconResult<Vec<Job>>;

    /// Replace a stored job with an updated copy
    async fn update_job(&self, job: &Job) -> ReconResult<()>;

    /// Oldest job still pending, if any
    async fn next_pending(&self) -> ReconResult<Option<Job>>;
}

/// Work executed by the scheduler for one job
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run the job to completion, returning where its reports were written
    async fn run(&self, job: &Job) -> ReconResult<JobArtifacts>;
}

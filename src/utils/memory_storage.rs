//! In-memory implementations of the storage traits

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::jobs::{Job, JobStatus};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct JobTable {
    jobs: HashMap<Uuid, Job>,
    // pending ids in submission order
    pending: VecDeque<Uuid>,
}

/// In-memory job store
///
/// Pending jobs are tracked in an explicit FIFO so the scheduler always picks
/// the oldest submission. Jobs are never removed.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    table: Arc<RwLock<JobTable>>,
}

impl MemoryJobStore {
    /// Create a new, empty job store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs ever submitted
    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs currently in `status`
    pub fn count_with_status(&self, status: JobStatus) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .values()
            .filter(|job| job.status == status)
            .count()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, job: Job) -> ReconResult<()> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if table.jobs.contains_key(&job.id) {
            return Err(ReconError::DuplicateJob(job.id.to_string()));
        }
        if job.status == JobStatus::Pending {
            table.pending.push_back(job.id);
        }
        table.jobs.insert(job.id, job);
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> ReconResult<Option<Job>> {
        Ok(self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .get(&id)
            .cloned())
    }

    async fn list_jobs(&self) -> ReconResult<Vec<Job>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let mut jobs: Vec<Job> = table.jobs.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    async fn update_job(&self, job: &Job) -> ReconResult<()> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = table.jobs.get_mut(&job.id) else {
            return Err(ReconError::JobNotFound(job.id.to_string()));
        };
        *stored = job.clone();

        if job.status != JobStatus::Pending {
            table.pending.retain(|id| *id != job.id);
        }
        Ok(())
    }

    async fn next_pending(&self) -> ReconResult<Option<Job>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table
            .pending
            .iter()
            .filter_map(|id| table.jobs.get(id))
            .find(|job| job.status == JobStatus::Pending)
            .cloned())
    }
}

/// In-memory record source for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    transactions: Arc<RwLock<Vec<Transaction>>>,
    bank_statements: Arc<RwLock<Vec<BankStatement>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MemoryRecordSource {
    pub fn new(transactions: Vec<Transaction>, bank_statements: Vec<BankStatement>) -> Self {
        Self {
            transactions: Arc::new(RwLock::new(transactions)),
            bank_statements: Arc::new(RwLock::new(bank_statements)),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Make every subsequent load fail with `reason` (`None` to recover)
    pub fn set_failure(&self, reason: Option<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = reason;
    }

    fn check_failure(&self) -> ReconResult<()> {
        match self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(reason) => Err(ReconError::Load(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn load_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconResult<Vec<Transaction>> {
        self.check_failure()?;
        let range = DateRange::new(start, end);
        Ok(self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|tx| range.contains(tx.date()))
            .cloned()
            .collect())
    }

    async fn load_bank_statements(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconResult<Vec<BankStatement>> {
        self.check_failure()?;
        let range = DateRange::new(start, end);
        Ok(self
            .bank_statements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|bs| range.contains(bs.date))
            .cloned()
            .collect())
    }
}

/// In-memory report sink that keeps everything it is given
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    unmatched: Arc<RwLock<HashMap<String, Vec<UnmatchedResult>>>>,
    summaries: Arc<RwLock<HashMap<String, ReconciliationSummary>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `reason` (`None` to recover)
    pub fn set_failure(&self, reason: Option<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = reason;
    }

    /// Unmatched records written for `destination_id`
    pub fn unmatched(&self, destination_id: &str) -> Option<Vec<UnmatchedResult>> {
        self.unmatched
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(destination_id)
            .cloned()
    }

    /// Summary written for `destination_id`
    pub fn summary(&self, destination_id: &str) -> Option<ReconciliationSummary> {
        self.summaries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(destination_id)
            .cloned()
    }

    fn check_failure(&self) -> ReconResult<()> {
        match self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(reason) => Err(ReconError::Persist(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn write_unmatched(
        &self,
        results: &[UnmatchedResult],
        destination_id: &str,
    ) -> ReconResult<String> {
        self.check_failure()?;
        self.unmatched
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(destination_id.to_string(), results.to_vec());
        Ok(format!("memory://unmatched/{destination_id}"))
    }

    async fn write_summary(
        &self,
        summary: &ReconciliationSummary,
        destination_id: &str,
    ) -> ReconResult<String> {
        self.check_failure()?;
        self.summaries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(destination_id.to_string(), summary.clone());
        Ok(format!("memory://summary/{destination_id}"))
    }
}

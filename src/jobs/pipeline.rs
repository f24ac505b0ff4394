//! Load -> reconcile -> persist pipeline executed for each job

use async_trait::async_trait;

use crate::jobs::{Job, JobArtifacts};
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::traits::{JobRunner, RecordSource, ReportSink};
use crate::types::*;

/// Reconciliation pipeline over a record source and a report sink
///
/// Any load error aborts the job before reduction. A persistence error fails
/// the job even though reduction succeeded; the in-memory report is dropped.
pub struct ReconciliationPipeline<R: RecordSource, W: ReportSink> {
    source: R,
    sink: W,
    engine: ReconciliationEngine,
}

impl<R: RecordSource, W: ReportSink> ReconciliationPipeline<R, W> {
    pub fn new(source: R, sink: W) -> Self {
        Self::with_engine(source, sink, ReconciliationEngine::new())
    }

    pub fn with_engine(source: R, sink: W, engine: ReconciliationEngine) -> Self {
        Self {
            source,
            sink,
            engine,
        }
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Load and reconcile the records for `job` without writing anything
    pub async fn reconcile(&self, job: &Job) -> ReconResult<ReconciliationReport> {
        let transactions = self
            .source
            .load_transactions(job.date_start(), job.date_end())
            .await?;
        let bank_statements = self
            .source
            .load_bank_statements(job.date_start(), job.date_end())
            .await?;

        tracing::info!(
            job_id = %job.id,
            transactions = transactions.len(),
            bank_statements = bank_statements.len(),
            "records loaded"
        );

        self.engine
            .reconcile(transactions, bank_statements, job.concurrency)
            .await
    }

    async fn persist(&self, job: &Job, report: &ReconciliationReport) -> ReconResult<JobArtifacts> {
        let destination = job.id.to_string();
        let unmatched_location = self
            .sink
            .write_unmatched(&report.unmatched(), &destination)
            .await?;
        let summary_location = self.sink.write_summary(&report.summary, &destination).await?;

        Ok(JobArtifacts {
            summary_location,
            unmatched_location,
        })
    }
}

#[async_trait]
impl<R: RecordSource, W: ReportSink> JobRunner for ReconciliationPipeline<R, W> {
    async fn run(&self, job: &Job) -> ReconResult<JobArtifacts> {
        let report = self.reconcile(job).await?;
        let summary = &report.summary;

        tracing::info!(
            job_id = %job.id,
            processed = summary.total_transactions_processed,
            matched = summary.total_matched_transactions,
            unmatched = summary.total_unmatched_transactions,
            discrepancy = %summary.total_discrepancies,
            "reconciliation complete"
        );

        self.persist(job, &report).await.inspect_err(|err| {
            tracing::error!(
                job_id = %job.id,
                error = %err,
                "reduction succeeded but reports could not be written"
            );
        })
    }
}

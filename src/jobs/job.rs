//! Job records and their lifecycle

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::{DateRange, ReconError, ReconResult};

/// Lifecycle status of a job
///
/// Transitions are `pending -> running -> finished | failed`. Terminal jobs
/// are never run again; a failed job has to be resubmitted as a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    /// Whether a job in this status may move to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Finished)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locations of the reports a finished job produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobArtifacts {
    pub summary_location: String,
    pub unmatched_location: String,
}

/// One submitted reconciliation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Globally unique identifier
    pub id: Uuid,
    /// Inclusive range of dates to reconcile
    pub range: DateRange,
    /// Number of reduction workers requested
    pub concurrency: usize,
    pub status: JobStatus,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub summary_location: Option<String>,
    pub unmatched_location: Option<String>,
    /// Why the job failed, if it did
    pub error: Option<String>,
}

impl Job {
    /// Create a new pending job with a fresh identifier
    pub fn new(date_start: NaiveDate, date_end: NaiveDate, concurrency: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            range: DateRange::new(date_start, date_end),
            concurrency,
            status: JobStatus::Pending,
            created_at: chrono::Utc::now().naive_utc(),
            started_at: None,
            finished_at: None,
            summary_location: None,
            unmatched_location: None,
            error: None,
        }
    }

    pub fn date_start(&self) -> NaiveDate {
        self.range.start
    }

    pub fn date_end(&self) -> NaiveDate {
        self.range.end
    }

    fn transition(&mut self, next: JobStatus) -> ReconResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ReconError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move a pending job to running
    pub fn mark_running(&mut self) -> ReconResult<()> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(chrono::Utc::now().naive_utc());
        Ok(())
    }

    /// Move a running job to finished and record its reports
    pub fn mark_finished(&mut self, artifacts: JobArtifacts) -> ReconResult<()> {
        self.transition(JobStatus::Finished)?;
        self.finished_at = Some(chrono::Utc::now().naive_utc());
        self.summary_location = Some(artifacts.summary_location);
        self.unmatched_location = Some(artifacts.unmatched_location);
        Ok(())
    }

    /// Move a running job to failed
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> ReconResult<()> {
        self.transition(JobStatus::Failed)?;
        self.finished_at = Some(chrono::Utc::now().naive_utc());
        self.error = Some(reason.into());
        Ok(())
    }
}

/// Status row returned to API callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub id: Uuid,
    pub status: JobStatus,
    pub report_location: Option<String>,
    pub unmatched_location: Option<String>,
    pub created_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            report_location: job.summary_location.clone(),
            unmatched_location: job.unmatched_location.clone(),
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        Job::new(day, day, 2)
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.finished_at.is_none());
        assert_ne!(job.id, Job::new(job.date_start(), job.date_end(), 1).id);
    }

    #[test]
    fn test_successful_lifecycle() {
        let mut job = job();
        job.mark_running().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.is_some());

        job.mark_finished(JobArtifacts {
            summary_location: "summary.csv".to_string(),
            unmatched_location: "unmatched.csv".to_string(),
        })
        .unwrap();
        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.summary_location.as_deref(), Some("summary.csv"));
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_running_cannot_be_skipped() {
        let mut job = job();
        assert!(matches!(
            job.mark_finished(JobArtifacts::default()),
            Err(ReconError::InvalidTransition { .. })
        ));
        assert!(job.mark_failed("boom").is_err());
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_terminal_jobs_are_never_rerun() {
        let mut job = job();
        job.mark_running().unwrap();
        job.mark_failed("source unavailable").unwrap();

        assert!(job.status.is_terminal());
        assert_eq!(job.error.as_deref(), Some("source unavailable"));
        assert!(job.mark_running().is_err());
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_status_serializes_verbatim() {
        for (status, text) in [
            (JobStatus::Pending, "\"pending\""),
            (JobStatus::Running, "\"running\""),
            (JobStatus::Finished, "\"finished\""),
            (JobStatus::Failed, "\"failed\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), text);
        }
    }
}

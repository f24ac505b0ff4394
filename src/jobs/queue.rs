//! Single-flight job scheduler
//!
//! The scheduler loop picks one pending job at a time, runs it to completion,
//! records the terminal status and only then looks for the next one. At most
//! one job's pipeline executes at any instant.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::jobs::Job;
use crate::traits::{JobRunner, JobStore};
use crate::types::*;

/// Idle time between scans when nothing is pending
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Queue of reconciliation jobs and the loop that executes them
pub struct JobQueue<S: JobStore, R: JobRunner> {
    store: Arc<S>,
    runner: Arc<R>,
    poll_interval: Duration,
    // held for the whole select-run-record step
    run_lock: Arc<Mutex<()>>,
}

impl<S: JobStore, R: JobRunner> Clone for JobQueue<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            runner: Arc::clone(&self.runner),
            poll_interval: self.poll_interval,
            run_lock: Arc::clone(&self.run_lock),
        }
    }
}

impl<S: JobStore, R: JobRunner> JobQueue<S, R> {
    /// Create a queue over `store` that executes jobs with `runner`
    pub fn new(store: S, runner: R) -> Self {
        Self {
            store: Arc::new(store),
            runner: Arc::new(runner),
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Override how long the loop idles when no job is pending
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submit a new job in `pending` status
    ///
    /// No validation of the range or concurrency happens here; callers are
    /// expected to validate before submitting.
    pub async fn submit(
        &self,
        date_start: NaiveDate,
        date_end: NaiveDate,
        concurrency: usize,
    ) -> ReconResult<Uuid> {
        let job = Job::new(date_start, date_end, concurrency);
        let id = job.id;
        self.store.insert_job(job).await?;

        tracing::info!(
            job_id = %id,
            start = %date_start,
            end = %date_end,
            concurrency,
            "job submitted"
        );
        Ok(id)
    }

    /// Snapshot of all jobs, terminal ones included
    ///
    /// Job history is never evicted, so this grows with every submission.
    pub async fn list_jobs(&self) -> ReconResult<Vec<Job>> {
        self.store.list_jobs().await
    }

    /// Get a job by id
    pub async fn get_job(&self, id: Uuid) -> ReconResult<Job> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| ReconError::JobNotFound(id.to_string()))
    }

    /// Run the oldest pending job, if there is one
    ///
    /// Returns the job in its terminal state. A pipeline error is recorded as
    /// `failed` on the job rather than returned; `Err` means the store itself
    /// could not be read or updated.
    pub async fn run_next_job(&self) -> ReconResult<Option<Job>> {
        let _guard = self.run_lock.lock().await;

        let Some(mut job) = self.store.next_pending().await? else {
            return Ok(None);
        };

        job.mark_running()?;
        self.store.update_job(&job).await?;
        tracing::info!(job_id = %job.id, range = %job.range, "job running");

        match self.runner.run(&job).await {
            Ok(artifacts) => {
                job.mark_finished(artifacts)?;
                tracing::info!(job_id = %job.id, "job finished");
            }
            Err(err) => {
                tracing::error!(job_id = %job.id, error = %err, "job failed");
                job.mark_failed(err.to_string())?;
            }
        }

        self.record_terminal(&job).await?;
        Ok(Some(job))
    }

    /// Persist a terminal job, retrying the write once
    ///
    /// If both writes fail the stored copy stays `running`; the outcome is
    /// logged with the job id so it is not lost.
    async fn record_terminal(&self, job: &Job) -> ReconResult<()> {
        let Err(first) = self.store.update_job(job).await else {
            return Ok(());
        };
        tracing::warn!(
            job_id = %job.id,
            status = %job.status,
            error = %first,
            "retrying terminal status write"
        );

        self.store.update_job(job).await.inspect_err(|err| {
            tracing::error!(
                job_id = %job.id,
                status = %job.status,
                summary = job.summary_location.as_deref().unwrap_or_default(),
                unmatched = job.unmatched_location.as_deref().unwrap_or_default(),
                job_error = job.error.as_deref().unwrap_or_default(),
                error = %err,
                "terminal status not recorded, job left running in store"
            )
        })
    }

    /// Drive the scheduler until `shutdown` flips to `true` or its sender
    /// is dropped
    ///
    /// Shutdown is only observed between jobs; a running pipeline is never
    /// interrupted. Errors are logged and the loop keeps going.
    pub async fn run_until_stopped(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(poll_interval = ?self.poll_interval, "scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_next_job().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => tracing::error!(error = %err, "scheduler step failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

impl<S, R> JobQueue<S, R>
where
    S: JobStore + 'static,
    R: JobRunner + 'static,
{
    /// Spawn the scheduler loop onto the current tokio runtime
    pub fn start(&self) -> SchedulerHandle {
        let (stop, shutdown) = watch::channel(false);
        let queue = self.clone();
        let task = tokio::spawn(async move { queue.run_until_stopped(shutdown).await });
        SchedulerHandle { stop, task }
    }
}

/// Handle to a spawned scheduler loop
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the loop to stop after the current job and wait for it to exit
    pub async fn shutdown(self) {
        // send only fails if the loop already exited
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "scheduler task ended abnormally");
        }
    }
}

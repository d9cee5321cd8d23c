use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{Job, PipelineJob, Scheduler};
use crate::coordinator::{InvocationOutcome, PipelineWorker};
use crate::errors::CoordinatorError;

/// Downstream worker that processes one batch of a batched export
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn perform_batch(&self, batch_id: i32) -> anyhow::Result<()>;
}

/// What the runtime did with a pipeline job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDisposition {
    Completed(InvocationOutcome),
    /// Unexpected error; the same jid runs again after `delay`
    Retrying { attempt: u32, delay: Duration },
    /// Retry budget spent; the failure path ran
    Exhausted,
    /// Tracker or entity no longer exists
    Dropped,
}

/// Delay before retry number `retry_count + 1`
pub fn retry_backoff(retry_count: u32) -> Duration {
    Duration::from_secs(u64::from(retry_count).saturating_pow(4).saturating_add(15))
}

/// Drains the job queue and owns the retry budget for unexpected errors
pub struct WorkerRuntime {
    worker: Arc<PipelineWorker>,
    scheduler: Arc<dyn Scheduler>,
    batch_handler: Arc<dyn BatchHandler>,
    max_retries: u32,
}

impl WorkerRuntime {
    pub fn new(
        worker: Arc<PipelineWorker>,
        scheduler: Arc<dyn Scheduler>,
        batch_handler: Arc<dyn BatchHandler>,
    ) -> Self {
        let max_retries = worker.config().max_runtime_retries;
        Self {
            worker,
            scheduler,
            batch_handler,
            max_retries,
        }
    }

    /// Process jobs concurrently until every sender of the queue is dropped
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Job>) {
        info!("Worker runtime started");

        while let Some(job) = rx.recv().await {
            let runtime = self.clone();
            tokio::spawn(async move {
                runtime.handle_job(job).await;
            });
        }

        info!("Job queue closed, worker runtime stopped");
    }

    pub async fn handle_job(&self, job: Job) {
        match job {
            Job::Pipeline(job) => {
                let disposition = self.handle_pipeline(job).await;
                debug!(?disposition, "Pipeline job handled");
            }
            Job::Batch { batch_id } => {
                if let Err(err) = self.batch_handler.perform_batch(batch_id).await {
                    error!(batch_id, error = %err, "Batch job failed");
                }
            }
        }
    }

    pub async fn handle_pipeline(&self, job: PipelineJob) -> JobDisposition {
        let err = match self.worker.perform(&job).await {
            Ok(outcome) => return JobDisposition::Completed(outcome),
            Err(err) => err,
        };

        if err.is_not_found() {
            warn!(
                tracker_id = job.tracker_id,
                entity_id = job.entity_id,
                error = %err,
                "Dropping pipeline job"
            );
            return JobDisposition::Dropped;
        }

        if job.attempt >= self.max_retries {
            self.exhaust(&job, &err).await;
            return JobDisposition::Exhausted;
        }

        let delay = retry_backoff(job.attempt);
        let retry = job.retried();
        warn!(
            tracker_id = job.tracker_id,
            jid = %job.jid,
            attempt = retry.attempt,
            delay_secs = delay.as_secs(),
            error = %err,
            "Pipeline job failed, retrying"
        );

        match self.scheduler.schedule_pipeline(retry.clone(), delay).await {
            Ok(()) => JobDisposition::Retrying {
                attempt: retry.attempt,
                delay,
            },
            Err(schedule_err) => {
                error!(error = %schedule_err, "Could not schedule retry");
                self.exhaust(&job, &err).await;
                JobDisposition::Exhausted
            }
        }
    }

    async fn exhaust(&self, job: &PipelineJob, err: &CoordinatorError) {
        if let Err(failure_err) = self.worker.perform_failure(job, err).await {
            error!(
                tracker_id = job.tracker_id,
                error = %failure_err,
                original_error = %err,
                "Could not record pipeline failure"
            );
        }
    }
}

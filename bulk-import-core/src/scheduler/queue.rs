use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Job, PipelineJob, Scheduler};

/// In-process scheduler delivering jobs into a channel
///
/// Delayed jobs wait in their own task so the caller returns immediately.
#[derive(Clone)]
pub struct QueueScheduler {
    tx: mpsc::Sender<Job>,
}

impl QueueScheduler {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn deliver(&self, job: Job, delay: Duration) -> anyhow::Result<()> {
        if self.tx.is_closed() {
            return Err(anyhow!("Job queue is closed"));
        }

        if delay.is_zero() {
            return self
                .tx
                .send(job)
                .await
                .map_err(|_| anyhow!("Job queue is closed"));
        }

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(job).await.is_err() {
                warn!("Job queue closed before delayed job was delivered");
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Scheduler for QueueScheduler {
    async fn schedule_pipeline(&self, job: PipelineJob, delay: Duration) -> anyhow::Result<()> {
        debug!(
            tracker_id = job.tracker_id,
            jid = %job.jid,
            delay_secs = delay.as_secs(),
            "Scheduling pipeline job"
        );
        self.deliver(Job::Pipeline(job), delay).await
    }

    async fn schedule_batch(&self, batch_id: i32) -> anyhow::Result<()> {
        debug!(batch_id, "Scheduling batch job");
        self.deliver(Job::Batch { batch_id }, Duration::ZERO).await
    }
}

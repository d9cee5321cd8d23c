//! Scheduling seam between the coordinator and the job runtime
//!
//! Suspension is always "schedule again later": an invocation that cannot proceed
//! schedules a fresh job and returns. Nothing waits in memory between invocations.

pub mod queue;
pub mod runtime;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use queue::QueueScheduler;
pub use runtime::{retry_backoff, BatchHandler, JobDisposition, WorkerRuntime};

/// Arguments of one coordinator invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineJob {
    pub tracker_id: i32,
    pub entity_id: i32,
    /// Scheduling-run identifier, recorded on the tracker
    pub jid: String,
    /// Carried across re-enqueues so failures can be traced back to the first run
    pub correlation_id: String,
    /// Runtime retries already spent on this jid
    pub attempt: u32,
}

impl PipelineJob {
    pub fn new(tracker_id: i32, entity_id: i32) -> Self {
        Self {
            tracker_id,
            entity_id,
            jid: new_jid(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            attempt: 0,
        }
    }

    /// A new run of the same tracker, as scheduled by a re-enqueue
    pub fn re_enqueued(&self) -> Self {
        Self {
            jid: new_jid(),
            attempt: 0,
            ..self.clone()
        }
    }

    /// The same run again, as scheduled by the runtime after an unexpected error
    pub fn retried(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

fn new_jid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Work delivered to the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Job {
    Pipeline(PipelineJob),
    Batch { batch_id: i32 },
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Run the coordinator for `job` after `delay`
    async fn schedule_pipeline(&self, job: PipelineJob, delay: Duration) -> anyhow::Result<()>;

    /// Run the batch worker for one batch as soon as possible
    async fn schedule_batch(&self, batch_id: i32) -> anyhow::Result<()>;
}

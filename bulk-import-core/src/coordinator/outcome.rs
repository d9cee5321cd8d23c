use std::time::Duration;

use serde::Serialize;

/// What one worker invocation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InvocationOutcome {
    /// Entity failed; tracker moved to `skipped`
    Skipped,
    /// Export not ready; the same tracker runs again after `delay`
    ReEnqueued { delay: Duration },
    /// Destination under load; nothing ran
    Deferred { delay: Duration },
    /// Pipeline ran to completion (or a batched export had no batches)
    Finished,
    /// Batched export split into `count` batch jobs
    BatchesEnqueued { count: u32 },
    /// Pipeline asked to be retried; tracker is pending again
    Retrying { delay: Duration },
    /// Terminal error recorded as a failure
    Failed { exception_class: String },
    /// Another invocation holds this tracker's lease
    LeaseHeld,
    /// Tracker is not enqueued or started; nothing to do
    NotRunnable { status: String },
}

impl InvocationOutcome {
    /// Whether the tracker was left for a later invocation to pick up
    pub fn is_rescheduled(&self) -> bool {
        matches!(
            self,
            Self::ReEnqueued { .. } | Self::Deferred { .. } | Self::Retrying { .. }
        )
    }
}

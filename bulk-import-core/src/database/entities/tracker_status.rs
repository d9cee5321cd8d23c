use serde::{Deserialize, Serialize};

/// Lifecycle of a pipeline tracker
///
/// `Finished`, `Failed` and `Skipped` are terminal for an attempt. A tracker that
/// hits a transient condition goes back to `Enqueued` through the `Retry` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerStatus {
    /// Planned but never scheduled
    Created,
    /// Waiting for a worker invocation (also the pending status after a retry)
    Enqueued,
    /// A worker has started the pipeline
    Started,
    /// Pipeline completed successfully
    Finished,
    /// Pipeline failed terminally
    Failed,
    /// Pipeline was skipped because its entity failed
    Skipped,
}

/// Events that move a tracker between statuses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerEvent {
    Enqueue,
    Start,
    Retry,
    Finish,
    Skip,
    FailOp,
}

impl TrackerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerStatus::Created => "created",
            TrackerStatus::Enqueued => "enqueued",
            TrackerStatus::Started => "started",
            TrackerStatus::Finished => "finished",
            TrackerStatus::Failed => "failed",
            TrackerStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(TrackerStatus::Created),
            "enqueued" => Some(TrackerStatus::Enqueued),
            "started" => Some(TrackerStatus::Started),
            "finished" => Some(TrackerStatus::Finished),
            "failed" => Some(TrackerStatus::Failed),
            "skipped" => Some(TrackerStatus::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackerStatus::Finished | TrackerStatus::Failed | TrackerStatus::Skipped
        )
    }

    /// Status reached by applying `event`, or `None` when the event is not allowed
    pub fn apply(self, event: TrackerEvent) -> Option<TrackerStatus> {
        use TrackerStatus::*;

        match (event, self) {
            (TrackerEvent::Enqueue, Created) => Some(Enqueued),
            (TrackerEvent::Start, Enqueued | Started) => Some(Started),
            (TrackerEvent::Retry, Started | Enqueued) => Some(Enqueued),
            (TrackerEvent::Finish, Started) => Some(Finished),
            (TrackerEvent::Finish, Finished | Failed | Skipped) => Some(self),
            (TrackerEvent::Skip, status) if !status.is_terminal() => Some(Skipped),
            (TrackerEvent::Skip, Skipped) => Some(Skipped),
            (TrackerEvent::FailOp, _) => Some(Failed),
            _ => None,
        }
    }
}

impl TrackerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerEvent::Enqueue => "enqueue",
            TrackerEvent::Start => "start",
            TrackerEvent::Retry => "retry",
            TrackerEvent::Finish => "finish",
            TrackerEvent::Skip => "skip",
            TrackerEvent::FailOp => "fail_op",
        }
    }
}

impl std::fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

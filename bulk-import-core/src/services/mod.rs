pub mod batch_enqueuer;
pub mod failure_recorder;
pub mod tracker_service;

pub use batch_enqueuer::BatchEnqueuer;
pub use failure_recorder::{ErrorTracker, FailureRecorder, FailureReport, LogErrorTracker};
pub use tracker_service::{TrackerService, Transition};

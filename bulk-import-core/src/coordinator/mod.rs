//! Pipeline execution coordinator
//!
//! [`PipelineWorker`] is the runtime-facing entry point. It applies the health gate,
//! takes the tracker's lease and hands over to [`TrackerStateMachine`], which decides
//! whether to skip, fail, re-enqueue, fan out into batches or run the pipeline.

pub mod outcome;
pub mod state_machine;
pub mod worker;

pub use outcome::InvocationOutcome;
pub use state_machine::{decide, Decision, DecisionInput, TrackerStateMachine};
pub use worker::{Collaborators, PipelineWorker};

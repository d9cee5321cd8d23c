//! Decision algorithm for one tracker invocation
//!
//! [`decide`] is a pure function of the entity flag, the pipeline kind and the export
//! snapshot; [`TrackerStateMachine`] polls the inputs, applies the decision and owns
//! every status write made while the tracker runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::outcome::InvocationOutcome;
use crate::database::entities::{bulk_import_entities, pipeline_trackers, TrackerEvent};
use crate::errors::{CoordinatorError, CoordinatorResult, PipelineError};
use crate::export_status::{ExportStatusEvaluator, ExportStatusSnapshot};
use crate::logging::{log_exception, LogAttributes};
use crate::pipeline::{Pipeline, PipelineContext, PipelineOutcome, PipelineRegistry};
use crate::scheduler::{PipelineJob, Scheduler};
use crate::services::{BatchEnqueuer, TrackerService, Transition};

pub const EMPTY_EXPORT_MESSAGE: &str = "Empty export status on source instance";

/// Next action for a runnable tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Fail(PipelineError),
    ReEnqueue,
    StartBatched { batches_count: u32 },
    FinishEmptyBatched,
    Run,
}

#[derive(Debug, Clone)]
pub struct DecisionInput<'a> {
    pub entity_failed: bool,
    pub file_extraction: bool,
    /// Only polled for file-extraction pipelines of live entities
    pub export: Option<&'a ExportStatusSnapshot>,
    /// Time since the tracker (or its entity) was created
    pub age: Duration,
    pub empty_export_timeout: Duration,
}

pub fn decide(input: &DecisionInput<'_>) -> Decision {
    if input.entity_failed {
        return Decision::Skip;
    }

    let export = match input.export {
        Some(export) if input.file_extraction => export,
        _ => return Decision::Run,
    };

    if export.failed {
        return Decision::Fail(PipelineError::UpstreamFailed(
            export.error.clone().unwrap_or_default(),
        ));
    }

    if export.empty && input.age >= input.empty_export_timeout {
        return Decision::Fail(PipelineError::Expired(EMPTY_EXPORT_MESSAGE.to_string()));
    }

    if export.is_pending() {
        return Decision::ReEnqueue;
    }

    if export.batched {
        return if export.batches_count == 0 {
            Decision::FinishEmptyBatched
        } else {
            Decision::StartBatched {
                batches_count: export.batches_count,
            }
        };
    }

    Decision::Run
}

#[derive(Clone)]
pub struct TrackerStateMachine {
    trackers: TrackerService,
    registry: PipelineRegistry,
    export_status: ExportStatusEvaluator,
    batches: BatchEnqueuer,
    scheduler: Arc<dyn Scheduler>,
    re_enqueue_delay: Duration,
    empty_export_timeout: Duration,
}

impl TrackerStateMachine {
    pub fn new(
        trackers: TrackerService,
        registry: PipelineRegistry,
        export_status: ExportStatusEvaluator,
        batches: BatchEnqueuer,
        scheduler: Arc<dyn Scheduler>,
        re_enqueue_delay: Duration,
        empty_export_timeout: Duration,
    ) -> Self {
        Self {
            trackers,
            registry,
            export_status,
            batches,
            scheduler,
            re_enqueue_delay,
            empty_export_timeout,
        }
    }

    /// Run the decision algorithm for a tracker in `enqueued` or `started`
    ///
    /// Terminal conditions come back as `CoordinatorError::Pipeline`; the caller
    /// records them. Every other error is left to the runtime's retry budget.
    pub async fn run(
        &self,
        tracker: &pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
        job: &PipelineJob,
        attributes: &LogAttributes,
    ) -> CoordinatorResult<InvocationOutcome> {
        let entity_failed = entity.is_failed();
        // A failed entity skips even when its pipeline is no longer registered
        let pipeline = self.registry.get(&tracker.pipeline_name);
        let file_extraction = pipeline
            .as_ref()
            .is_ok_and(|pipeline| pipeline.is_file_extraction());
        let export = match &pipeline {
            Ok(pipeline) if file_extraction && !entity_failed => Some(
                self.export_status
                    .evaluate(tracker, entity, pipeline.relation())
                    .await,
            ),
            _ => None,
        };

        let decision = decide(&DecisionInput {
            entity_failed,
            file_extraction,
            export: export.as_ref(),
            age: Self::age(tracker, entity),
            empty_export_timeout: self.empty_export_timeout,
        });

        match decision {
            Decision::Skip => self.skip(tracker, job).await,
            Decision::Fail(err) => Err(err.into()),
            Decision::ReEnqueue => {
                info!(re_enqueue = true, "Export not ready, re-enqueueing pipeline");
                self.re_enqueue(job, self.re_enqueue_delay).await?;
                Ok(InvocationOutcome::ReEnqueued {
                    delay: self.re_enqueue_delay,
                })
            }
            Decision::FinishEmptyBatched => {
                info!(batched = true, batches_count = 0, "Batched export is empty");
                let started = self.start(tracker, job, true).await?;
                self.trackers
                    .transition(&started, Transition::new(TrackerEvent::Finish))
                    .await?;
                Ok(InvocationOutcome::Finished)
            }
            Decision::StartBatched { batches_count } => {
                info!(batched = true, batches_count, "Starting batched pipeline");
                let started = self.start(tracker, job, true).await?;
                self.batches.enqueue_batches(&started, batches_count).await?;
                Ok(InvocationOutcome::BatchesEnqueued {
                    count: batches_count,
                })
            }
            Decision::Run => {
                let pipeline = pipeline?;
                info!(batched = false, "Running pipeline");
                let started = self.start(tracker, job, false).await?;
                self.execute(pipeline, started, entity, job, attributes)
                    .await
            }
        }
    }

    async fn execute(
        &self,
        pipeline: Arc<dyn Pipeline>,
        tracker: pipeline_trackers::Model,
        entity: &bulk_import_entities::Model,
        job: &PipelineJob,
        attributes: &LogAttributes,
    ) -> CoordinatorResult<InvocationOutcome> {
        let context = PipelineContext::new(tracker, entity.clone(), job.jid.clone());

        match pipeline.run(&context).await? {
            PipelineOutcome::Ok => {
                self.trackers
                    .transition(&context.tracker, Transition::new(TrackerEvent::Finish))
                    .await?;
                info!("Pipeline finished");
                Ok(InvocationOutcome::Finished)
            }
            PipelineOutcome::Retry { delay, reason } => {
                let attributes = attributes.clone().with_state(&context.tracker);
                log_exception(&attributes, "RetryPipelineError", &reason, "Retrying pipeline");
                self.trackers
                    .transition(
                        &context.tracker,
                        Transition::new(TrackerEvent::Retry).jid(&job.jid),
                    )
                    .await?;
                self.re_enqueue(job, delay).await?;
                Ok(InvocationOutcome::Retrying { delay })
            }
            PipelineOutcome::Fatal { class, message } => {
                Err(PipelineError::Fatal { class, message }.into())
            }
        }
    }

    async fn start(
        &self,
        tracker: &pipeline_trackers::Model,
        job: &PipelineJob,
        batched: bool,
    ) -> CoordinatorResult<pipeline_trackers::Model> {
        let mut transition = Transition::new(TrackerEvent::Start).jid(&job.jid);
        if batched {
            transition = transition.batched(true);
        }
        self.trackers.transition(tracker, transition).await
    }

    async fn skip(
        &self,
        tracker: &pipeline_trackers::Model,
        job: &PipelineJob,
    ) -> CoordinatorResult<InvocationOutcome> {
        info!("Skipping pipeline due to failed entity");
        self.trackers
            .transition(tracker, Transition::new(TrackerEvent::Skip).jid(&job.jid))
            .await?;
        Ok(InvocationOutcome::Skipped)
    }

    async fn re_enqueue(&self, job: &PipelineJob, delay: Duration) -> CoordinatorResult<()> {
        self.scheduler
            .schedule_pipeline(job.re_enqueued(), delay)
            .await
            .map_err(CoordinatorError::Scheduling)
    }

    fn age(tracker: &pipeline_trackers::Model, entity: &bulk_import_entities::Model) -> Duration {
        let created_at = tracker.created_at.unwrap_or(entity.created_at);
        (Utc::now() - created_at).to_std().unwrap_or_else(|_| {
            warn!(tracker_id = tracker.id, "Tracker created in the future");
            Duration::ZERO
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(300);

    fn input(export: Option<&ExportStatusSnapshot>, age: Duration) -> DecisionInput<'_> {
        DecisionInput {
            entity_failed: false,
            file_extraction: true,
            export,
            age,
            empty_export_timeout: TIMEOUT,
        }
    }

    #[test]
    fn test_failed_entity_always_skips() {
        let failed = ExportStatusSnapshot::failed("disk full");
        let mut input = input(Some(&failed), Duration::ZERO);
        input.entity_failed = true;
        assert_eq!(decide(&input), Decision::Skip);
    }

    #[test]
    fn test_upstream_failure_is_fatal() {
        let failed = ExportStatusSnapshot::failed("disk full");
        assert_eq!(
            decide(&input(Some(&failed), Duration::ZERO)),
            Decision::Fail(PipelineError::UpstreamFailed("disk full".to_string()))
        );
    }

    #[test]
    fn test_empty_export_waits_then_expires() {
        let empty = ExportStatusSnapshot::empty();
        assert_eq!(
            decide(&input(Some(&empty), Duration::from_secs(299))),
            Decision::ReEnqueue
        );
        assert_eq!(
            decide(&input(Some(&empty), TIMEOUT)),
            Decision::Fail(PipelineError::Expired(EMPTY_EXPORT_MESSAGE.to_string()))
        );
    }

    #[test]
    fn test_started_export_never_expires() {
        let started = ExportStatusSnapshot::started();
        assert_eq!(
            decide(&input(Some(&started), Duration::from_secs(3_600))),
            Decision::ReEnqueue
        );
    }

    #[test]
    fn test_batched_exports() {
        let three = ExportStatusSnapshot::batched(3);
        assert_eq!(
            decide(&input(Some(&three), Duration::ZERO)),
            Decision::StartBatched { batches_count: 3 }
        );

        let none = ExportStatusSnapshot::batched(0);
        assert_eq!(
            decide(&input(Some(&none), Duration::ZERO)),
            Decision::FinishEmptyBatched
        );
    }

    #[test]
    fn test_ready_export_runs() {
        let ready = ExportStatusSnapshot::ready();
        assert_eq!(decide(&input(Some(&ready), Duration::ZERO)), Decision::Run);
    }

    #[test]
    fn test_non_file_extraction_ignores_export() {
        let empty = ExportStatusSnapshot::empty();
        let mut input = input(Some(&empty), TIMEOUT);
        input.file_extraction = false;
        assert_eq!(decide(&input), Decision::Run);
    }
}

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{debug, info, Instrument};

use super::outcome::InvocationOutcome;
use super::state_machine::TrackerStateMachine;
use crate::config::CoordinatorConfig;
use crate::database::entities::{bulk_import_entities, import_failures, pipeline_trackers};
use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::export_status::{ExportStatusClient, ExportStatusEvaluator};
use crate::health::{HealthDecision, HealthDeferralPolicy, HealthOracle, SchemaResolver};
use crate::lease::{LeaseGuard, LeaseStore};
use crate::logging::{record_tracker_state, LogAttributes};
use crate::pipeline::PipelineRegistry;
use crate::scheduler::{PipelineJob, Scheduler};
use crate::services::{BatchEnqueuer, ErrorTracker, FailureRecorder, FailureReport, TrackerService};

/// External services the worker talks to
#[derive(Clone)]
pub struct Collaborators {
    pub export_client: Arc<dyn ExportStatusClient>,
    pub schema_resolver: Arc<dyn SchemaResolver>,
    pub health_oracle: Arc<dyn HealthOracle>,
    pub lease_store: Arc<dyn LeaseStore>,
    pub scheduler: Arc<dyn Scheduler>,
    pub error_tracker: Arc<dyn ErrorTracker>,
}

/// Entry point invoked by the runtime for one `(tracker, entity)` pair
#[derive(Clone)]
pub struct PipelineWorker {
    config: CoordinatorConfig,
    trackers: TrackerService,
    state_machine: TrackerStateMachine,
    health: HealthDeferralPolicy,
    lease: LeaseGuard,
    failures: FailureRecorder,
    scheduler: Arc<dyn Scheduler>,
}

impl PipelineWorker {
    pub fn new(
        db: DatabaseConnection,
        config: CoordinatorConfig,
        registry: PipelineRegistry,
        collaborators: Collaborators,
    ) -> Self {
        let trackers = TrackerService::new(db.clone());
        let state_machine = TrackerStateMachine::new(
            trackers.clone(),
            registry,
            ExportStatusEvaluator::new(collaborators.export_client),
            BatchEnqueuer::new(db.clone(), collaborators.scheduler.clone()),
            collaborators.scheduler.clone(),
            config.re_enqueue_delay,
            config.empty_export_timeout,
        );
        let health = HealthDeferralPolicy::new(
            &config,
            collaborators.schema_resolver,
            collaborators.health_oracle,
        );
        let lease = LeaseGuard::new(collaborators.lease_store, config.lease_timeout);
        let failures = FailureRecorder::new(db, collaborators.error_tracker);

        Self {
            config,
            trackers,
            state_machine,
            health,
            lease,
            failures,
            scheduler: collaborators.scheduler,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Drive the tracker one step forward
    ///
    /// Returns `Err` only for errors the runtime should retry (or drop, for
    /// `NotFound`). Terminal pipeline errors are recorded here and reported as
    /// `InvocationOutcome::Failed`.
    pub async fn perform(&self, job: &PipelineJob) -> CoordinatorResult<InvocationOutcome> {
        let (entity, tracker, attributes) = self.load(job).await?;
        let span = attributes.span();

        self.perform_in_span(job, entity, tracker, attributes)
            .instrument(span)
            .await
    }

    /// Record the error that exhausted the runtime's retry budget
    pub async fn perform_failure(
        &self,
        job: &PipelineJob,
        err: &CoordinatorError,
    ) -> CoordinatorResult<import_failures::Model> {
        let (entity, tracker, attributes) = self.load(job).await?;
        let span = attributes.span();

        async {
            info!(attempts = job.attempt, "Runtime retries exhausted, failing pipeline");
            self.failures
                .fail_tracker(
                    &tracker,
                    &entity,
                    &FailureReport::from(err),
                    &attributes,
                    &job.jid,
                    Some(&job.correlation_id),
                )
                .await
        }
        .instrument(span)
        .await
    }

    async fn load(
        &self,
        job: &PipelineJob,
    ) -> CoordinatorResult<(
        bulk_import_entities::Model,
        pipeline_trackers::Model,
        LogAttributes,
    )> {
        let entity = self.trackers.find_entity(job.entity_id).await?;
        let tracker = self.trackers.find_tracker(job.tracker_id).await?;
        let source_version = self.trackers.source_version(&entity).await?;
        let attributes = LogAttributes::new(&entity, &tracker, source_version);
        Ok((entity, tracker, attributes))
    }

    async fn perform_in_span(
        &self,
        job: &PipelineJob,
        entity: bulk_import_entities::Model,
        tracker: pipeline_trackers::Model,
        attributes: LogAttributes,
    ) -> CoordinatorResult<InvocationOutcome> {
        if let HealthDecision::Defer {
            delay,
            schema,
            tables,
        } = self.health.check(&tracker, &entity).await
        {
            info!(
                deferred = true,
                %schema,
                tables = ?tables,
                delay_secs = delay.as_secs(),
                "Destination under load, deferring pipeline"
            );
            self.scheduler
                .schedule_pipeline(job.re_enqueued(), delay)
                .await
                .map_err(CoordinatorError::Scheduling)?;
            return Ok(InvocationOutcome::Deferred { delay });
        }

        let key = self.config.lease_key(job.tracker_id);
        match self
            .lease
            .try_with_lease(&key, || self.run_locked(job, &entity, &attributes))
            .await
        {
            Some(result) => result,
            None => {
                debug!(lease_key = %key, "Tracker owned by another invocation");
                Ok(InvocationOutcome::LeaseHeld)
            }
        }
    }

    async fn run_locked(
        &self,
        job: &PipelineJob,
        entity: &bulk_import_entities::Model,
        attributes: &LogAttributes,
    ) -> CoordinatorResult<InvocationOutcome> {
        // Status may have moved while we waited for the lease
        let tracker = self.trackers.find_tracker(job.tracker_id).await?;
        record_tracker_state(&tracker);
        if !tracker.is_runnable() {
            debug!(status = %tracker.status, "Tracker not runnable, nothing to do");
            return Ok(InvocationOutcome::NotRunnable {
                status: tracker.status,
            });
        }

        let attributes = attributes.clone().with_state(&tracker);
        info!(jid = %job.jid, "Pipeline starting");

        match self.state_machine.run(&tracker, entity, job, &attributes).await {
            Err(err) if err.is_terminal() => {
                let tracker = self.trackers.find_tracker(job.tracker_id).await?;
                let report = FailureReport::from(&err);
                self.failures
                    .fail_tracker(
                        &tracker,
                        entity,
                        &report,
                        &attributes,
                        &job.jid,
                        Some(&job.correlation_id),
                    )
                    .await?;
                Ok(InvocationOutcome::Failed {
                    exception_class: report.exception_class,
                })
            }
            other => other,
        }
    }
}
